//! Resolves a user supplied id or search term to a single entity.
//!
//! GUID shaped input is a point lookup. Anything else searches the whole collection, and more
//! than one hit becomes a multiple results outcome listing the candidate ids in collection order.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    response::CommandError,
    services::{
        AttachmentView, CipherService, CipherView, CollectionService, CollectionView,
        FolderService, FolderView, OrgCollectionView, OrganizationService, OrganizationUserView,
        OrganizationView, SendService, SendView, ServiceError,
    },
};

/// Whether `input` has the canonical hyphenated 8-4-4-4-12 hex shape.
pub fn is_guid(input: &str) -> bool {
    const GROUPS: [usize; 5] = [8, 4, 4, 4, 12];
    let parts: Vec<&str> = input.split('-').collect();
    parts.len() == GROUPS.len()
        && parts
            .iter()
            .zip(GROUPS)
            .all(|(part, len)| part.len() == len && part.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Trim an id argument and lowercase it when it is GUID shaped.
pub fn normalize_id(input: &str) -> String {
    let trimmed = input.trim();
    if is_guid(trimmed) {
        trimmed.to_lowercase()
    } else {
        trimmed.to_owned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityReference {
    Guid(Uuid),
    SearchTerm(String),
    Empty,
}

impl EntityReference {
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if is_guid(trimmed) {
            if let Ok(id) = Uuid::parse_str(trimmed) {
                return EntityReference::Guid(id);
            }
        }
        if trimmed.is_empty() {
            EntityReference::Empty
        } else {
            EntityReference::SearchTerm(trimmed.to_owned())
        }
    }
}

/// An entity that can be found by free text search.
pub trait Searchable {
    fn id(&self) -> String;
    /// `term` is already lowercased.
    fn matches(&self, term: &str) -> bool;
}

fn contains(value: Option<&str>, term: &str) -> bool {
    value.is_some_and(|v| v.to_lowercase().contains(term))
}

fn id_string(id: Option<Uuid>) -> String {
    id.map(|id| id.to_string()).unwrap_or_default()
}

impl Searchable for CipherView {
    fn id(&self) -> String {
        id_string(self.id)
    }

    fn matches(&self, term: &str) -> bool {
        contains(Some(&self.name), term)
            || (term.len() >= 8 && self.id().starts_with(term))
            || contains(self.subtitle().as_deref(), term)
            || contains(self.login_uri(), term)
    }
}

impl Searchable for FolderView {
    fn id(&self) -> String {
        id_string(self.id)
    }

    fn matches(&self, term: &str) -> bool {
        contains(Some(&self.name), term)
    }
}

impl Searchable for CollectionView {
    fn id(&self) -> String {
        id_string(self.id)
    }

    fn matches(&self, term: &str) -> bool {
        contains(Some(&self.name), term)
    }
}

impl Searchable for OrgCollectionView {
    fn id(&self) -> String {
        id_string(self.id)
    }

    fn matches(&self, term: &str) -> bool {
        contains(Some(&self.name), term)
    }
}

impl Searchable for OrganizationView {
    fn id(&self) -> String {
        self.id.to_string()
    }

    fn matches(&self, term: &str) -> bool {
        contains(Some(&self.name), term)
    }
}

impl Searchable for OrganizationUserView {
    fn id(&self) -> String {
        self.id.to_string()
    }

    fn matches(&self, term: &str) -> bool {
        contains(Some(&self.email), term) || contains(self.name.as_deref(), term)
    }
}

impl Searchable for SendView {
    fn id(&self) -> String {
        id_string(self.id)
    }

    fn matches(&self, term: &str) -> bool {
        contains(Some(&self.name), term)
            || (term.len() >= 8 && self.id().starts_with(term))
            || contains(self.text.as_ref().and_then(|t| t.text.as_deref()), term)
            || contains(self.file.as_ref().map(|f| f.file_name.as_str()), term)
    }
}

/// Keep the entities matching a search term, preserving their order.
pub fn search<T: Searchable>(entities: Vec<T>, term: &str) -> Vec<T> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return entities;
    }
    entities.into_iter().filter(|e| e.matches(&term)).collect()
}

/// Point lookups and listings for one kind of entity.
#[async_trait]
pub trait EntitySource<T>: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<T>, ServiceError>;
    async fn list(&self) -> Result<Vec<T>, ServiceError>;
}

macro_rules! entity_source {
    ($service:ident => $view:ty) => {
        #[async_trait]
        impl<S: $service + ?Sized> EntitySource<$view> for S {
            async fn get(&self, id: Uuid) -> Result<Option<$view>, ServiceError> {
                $service::get(self, id).await
            }

            async fn list(&self) -> Result<Vec<$view>, ServiceError> {
                $service::list(self).await
            }
        }
    };
}

entity_source!(CipherService => CipherView);
entity_source!(FolderService => FolderView);
entity_source!(CollectionService => CollectionView);
entity_source!(OrganizationService => OrganizationView);
entity_source!(SendService => SendView);

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<T> {
    Found(T),
    NotFound,
    /// Every candidate, in collection order.
    Multiple(Vec<T>),
}

impl<T: Searchable> Resolution<T> {
    fn from_matches(mut matches: Vec<T>) -> Self {
        match matches.len() {
            0 => Resolution::NotFound,
            1 => matches.pop().map_or(Resolution::NotFound, Resolution::Found),
            _ => Resolution::Multiple(matches),
        }
    }

    /// Narrow an ambiguous result. A single survivor becomes [`Resolution::Found`].
    pub fn filter(self, predicate: impl Fn(&T) -> bool) -> Self {
        match self {
            Resolution::Multiple(candidates) => {
                Self::from_matches(candidates.into_iter().filter(|c| predicate(c)).collect())
            }
            other => other,
        }
    }

    pub fn ids(&self) -> Vec<String> {
        match self {
            Resolution::Found(entity) => vec![entity.id()],
            Resolution::NotFound => Vec::new(),
            Resolution::Multiple(candidates) => candidates.iter().map(Searchable::id).collect(),
        }
    }

    pub fn into_result(self) -> Result<T, CommandError> {
        match self {
            Resolution::Found(entity) => Ok(entity),
            Resolution::NotFound => Err(CommandError::NotFound),
            multiple @ Resolution::Multiple(_) => {
                Err(CommandError::MultipleResults(multiple.ids()))
            }
        }
    }
}

pub async fn resolve<T, S>(source: &S, input: &str) -> Result<Resolution<T>, ServiceError>
where
    T: Searchable + Send,
    S: EntitySource<T> + ?Sized,
{
    match EntityReference::parse(input) {
        EntityReference::Guid(id) => Ok(source
            .get(id)
            .await?
            .map_or(Resolution::NotFound, Resolution::Found)),
        EntityReference::SearchTerm(term) => {
            Ok(Resolution::from_matches(search(source.list().await?, &term)))
        }
        EntityReference::Empty => Ok(Resolution::NotFound),
    }
}

/// Pick an attachment by id or file name.
///
/// Ids must match exactly while file names match on a case-insensitive substring. When several
/// attachments match, a single exact file name match wins. Otherwise every exact file name match
/// is returned, or every match when there is none.
pub fn resolve_attachment(
    attachments: &[AttachmentView],
    term: &str,
) -> Resolution<AttachmentView> {
    let lower = term.to_lowercase();
    let matches: Vec<&AttachmentView> = attachments
        .iter()
        .filter(|a| a.id == term || contains(a.file_name.as_deref(), &lower))
        .collect();

    match matches.as_slice() {
        [] => return Resolution::NotFound,
        [single] => return Resolution::Found((*single).clone()),
        _ => {}
    }

    let exact: Vec<&AttachmentView> = matches
        .iter()
        .copied()
        .filter(|a| {
            a.file_name
                .as_deref()
                .is_some_and(|name| name.to_lowercase() == lower)
        })
        .collect();

    match exact.as_slice() {
        [single] => Resolution::Found((*single).clone()),
        [] => Resolution::Multiple(matches.into_iter().cloned().collect()),
        _ => Resolution::Multiple(exact.into_iter().cloned().collect()),
    }
}

impl Searchable for AttachmentView {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn matches(&self, term: &str) -> bool {
        self.id == term || contains(self.file_name.as_deref(), term)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use uuid::uuid;

    use super::*;
    use crate::services::{CipherRepromptType, CipherType, LoginView, MockCipherService};

    fn cipher(id: Uuid, name: &str, username: Option<&str>) -> CipherView {
        let now = Utc::now();
        CipherView {
            id: Some(id),
            organization_id: None,
            folder_id: None,
            collection_ids: Vec::new(),
            r#type: CipherType::Login,
            name: name.to_owned(),
            notes: None,
            login: Some(LoginView {
                username: username.map(str::to_owned),
                ..Default::default()
            }),
            secure_note: None,
            card: None,
            identity: None,
            favorite: false,
            reprompt: CipherRepromptType::None,
            organization_use_totp: false,
            fields: Vec::new(),
            attachments: Vec::new(),
            revision_date: now,
            creation_date: now,
            deleted_date: None,
        }
    }

    fn attachment(id: &str, file_name: &str) -> AttachmentView {
        AttachmentView {
            id: id.to_owned(),
            file_name: Some(file_name.to_owned()),
            size: None,
            size_name: None,
            url: None,
        }
    }

    const A: Uuid = uuid!("11111111-1111-1111-1111-111111111111");
    const B: Uuid = uuid!("22222222-2222-2222-2222-222222222222");
    const C: Uuid = uuid!("33333333-3333-3333-3333-333333333333");

    #[test]
    fn test_guid_shape() {
        assert!(is_guid("8d4d5e32-9a1c-4f5b-bb83-0a1b2c3d4e5f"));
        assert!(is_guid("8D4D5E32-9A1C-4F5B-BB83-0A1B2C3D4E5F"));
        assert!(!is_guid("8d4d5e329a1c4f5bbb830a1b2c3d4e5f"));
        assert!(!is_guid("8d4d5e32-9a1c-4f5b-bb83-0a1b2c3d4e5g"));
        assert!(!is_guid("github"));
    }

    #[test]
    fn test_normalize_id() {
        assert_eq!(
            normalize_id("  8D4D5E32-9A1C-4F5B-BB83-0A1B2C3D4E5F "),
            "8d4d5e32-9a1c-4f5b-bb83-0a1b2c3d4e5f"
        );
        assert_eq!(normalize_id(" GitHub "), "GitHub");
    }

    #[test]
    fn test_entity_reference() {
        assert_eq!(EntityReference::parse("   "), EntityReference::Empty);
        assert_eq!(
            EntityReference::parse(" GitHub "),
            EntityReference::SearchTerm("GitHub".to_owned())
        );
        assert_eq!(
            EntityReference::parse("11111111-1111-1111-1111-111111111111"),
            EntityReference::Guid(A)
        );
    }

    #[tokio::test]
    async fn test_guid_is_a_single_point_lookup() {
        for input in [
            "11111111-1111-1111-1111-111111111111",
            "11111111-1111-1111-1111-111111111111".to_uppercase().as_str(),
        ] {
            let mut service = MockCipherService::new();
            service
                .expect_get()
                .withf(|id| *id == A)
                .times(1)
                .returning(|id| Ok(Some(cipher(id, "GitHub", None))));
            service.expect_list().never();

            let service: Arc<dyn CipherService> = Arc::new(service);
            let resolution = resolve::<CipherView, _>(service.as_ref(), input)
                .await
                .unwrap();
            assert!(matches!(resolution, Resolution::Found(c) if c.id == Some(A)));
        }
    }

    #[tokio::test]
    async fn test_guid_without_entity_is_not_found() {
        let mut service = MockCipherService::new();
        service.expect_get().times(1).returning(|_| Ok(None));
        service.expect_list().never();

        let resolution = resolve::<CipherView, _>(&service, "11111111-1111-1111-1111-111111111111")
            .await
            .unwrap();
        assert_eq!(resolution, Resolution::NotFound);
    }

    #[tokio::test]
    async fn test_single_search_match_is_found() {
        let mut service = MockCipherService::new();
        service.expect_get().never();
        service.expect_list().times(1).returning(|| {
            Ok(vec![
                cipher(A, "GitHub", None),
                cipher(B, "Gmail", None),
            ])
        });

        let resolution = resolve::<CipherView, _>(&service, "github").await.unwrap();
        assert!(matches!(resolution, Resolution::Found(c) if c.id == Some(A)));
    }

    #[tokio::test]
    async fn test_multiple_matches_keep_collection_order() {
        let mut service = MockCipherService::new();
        service.expect_list().returning(|| {
            Ok(vec![
                cipher(C, "Work mail", None),
                cipher(A, "Personal mail", None),
                cipher(B, "Bank", None),
            ])
        });

        let resolution = resolve::<CipherView, _>(&service, "MAIL").await.unwrap();
        assert_eq!(resolution.ids(), vec![C.to_string(), A.to_string()]);

        let err = resolution.into_result().unwrap_err();
        assert!(matches!(err, CommandError::MultipleResults(ids) if ids.len() == 2));
    }

    #[tokio::test]
    async fn test_empty_input_is_not_found_without_calls() {
        let mut service = MockCipherService::new();
        service.expect_get().never();
        service.expect_list().never();

        let resolution = resolve::<CipherView, _>(&service, "  ").await.unwrap();
        assert_eq!(resolution, Resolution::NotFound);
    }

    #[test]
    fn test_filter_promotes_single_survivor() {
        let resolution = Resolution::Multiple(vec![
            cipher(A, "mail", None),
            cipher(B, "mail", Some("alice")),
            cipher(C, "mail", Some("  ")),
        ]);
        let filtered = resolution.filter(|c| c.login_username().is_some());
        assert!(matches!(filtered, Resolution::Found(c) if c.id == Some(B)));
    }

    #[test]
    fn test_filter_without_survivors_is_not_found() {
        let resolution =
            Resolution::Multiple(vec![cipher(A, "mail", None), cipher(B, "mail", None)]);
        assert_eq!(
            resolution.filter(|c| c.login_username().is_some()),
            Resolution::NotFound
        );
    }

    #[test]
    fn test_filter_leaves_found_untouched() {
        let resolution = Resolution::Found(cipher(A, "mail", None));
        assert!(matches!(
            resolution.filter(|c| c.login_username().is_some()),
            Resolution::Found(_)
        ));
    }

    #[test]
    fn test_search_matches_subtitle_and_id_prefix() {
        let ciphers = vec![cipher(A, "Bank", Some("alice")), cipher(B, "Mail", None)];
        assert_eq!(search(ciphers.clone(), "ALICE").len(), 1);
        assert_eq!(search(ciphers.clone(), "22222222").len(), 1);
        assert_eq!(search(ciphers, "2222").len(), 0);
    }

    #[test]
    fn test_attachment_by_id_or_name() {
        let attachments = vec![
            attachment("abc", "Recovery codes.txt"),
            attachment("def", "photo.png"),
        ];
        assert!(matches!(
            resolve_attachment(&attachments, "def"),
            Resolution::Found(a) if a.id == "def"
        ));
        assert!(matches!(
            resolve_attachment(&attachments, "RECOVERY"),
            Resolution::Found(a) if a.id == "abc"
        ));
        assert_eq!(resolve_attachment(&attachments, "missing"), Resolution::NotFound);
    }

    #[test]
    fn test_attachment_single_exact_name_wins() {
        let attachments = vec![
            attachment("a", "notes.txt"),
            attachment("b", "old notes.txt"),
        ];
        assert!(matches!(
            resolve_attachment(&attachments, "notes.txt"),
            Resolution::Found(a) if a.id == "a"
        ));
    }

    #[test]
    fn test_attachment_several_exact_names_are_ambiguous() {
        let attachments = vec![
            attachment("a", "notes.txt"),
            attachment("b", "Notes.TXT"),
            attachment("c", "old notes.txt"),
        ];
        let resolution = resolve_attachment(&attachments, "notes.txt");
        assert_eq!(resolution.ids(), vec!["a".to_owned(), "b".to_owned()]);
    }

    #[test]
    fn test_attachment_substring_matches_are_ambiguous() {
        let attachments = vec![attachment("a", "notes-1.txt"), attachment("b", "notes-2.txt")];
        let resolution = resolve_attachment(&attachments, "notes");
        assert_eq!(resolution.ids(), vec!["a".to_owned(), "b".to_owned()]);
    }
}
