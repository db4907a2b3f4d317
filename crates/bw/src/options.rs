//! Typed command options.
//!
//! Both front ends collect flags into an [`OptionBag`]: clap matches on the command line, the
//! query string in `bw serve`. Each command then maps the bag onto its own options struct. The
//! mapping is pure and never fails; unknown keys are ignored and missing ones take defaults.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::services::{PassphraseGeneratorRequest, PasswordGeneratorRequest};

const SEARCH: &[&str] = &["search"];
const URL: &[&str] = &["url"];
const FOLDER_ID: &[&str] = &["folderid", "folderId"];
const COLLECTION_ID: &[&str] = &["collectionid", "collectionId"];
const ORGANIZATION_ID: &[&str] = &["organizationid", "organizationId"];
const ITEM_ID: &[&str] = &["itemid", "itemId"];
const TRASH: &[&str] = &["trash"];
const OUTPUT: &[&str] = &["output"];
const FILE: &[&str] = &["file"];
const PERMANENT: &[&str] = &["permanent"];
const FORCE: &[&str] = &["force"];
const LAST: &[&str] = &["last"];
const TEXT: &[&str] = &["text"];

/// Raw flags keyed by the name they were given under.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionBag(BTreeMap<String, Value>);

impl OptionBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Insert `value` when it is set.
    pub fn insert_opt(
        &mut self,
        key: impl Into<String>,
        value: Option<impl Into<Value>>,
    ) -> &mut Self {
        if let Some(value) = value {
            self.insert(key, value);
        }
        self
    }

    /// Insert a switch only when it was given, leaving absent switches absent.
    pub fn insert_flag(&mut self, key: impl Into<String>, value: bool) -> &mut Self {
        if value {
            self.insert(key, true);
        }
        self
    }

    fn lookup(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter()
            .find_map(|key| self.0.get(*key))
            .filter(|value| !value.is_null())
    }

    /// `true`, `"true"` and `"1"` are truthy. Everything else, absence included, is false.
    pub fn flag(&self, keys: &[&str]) -> bool {
        match self.lookup(keys) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s == "true" || s == "1",
            Some(Value::Number(n)) => n.as_i64() == Some(1),
            _ => false,
        }
    }

    /// True whenever the flag is present, unless it was explicitly set to false.
    pub fn presence_flag(&self, keys: &[&str]) -> bool {
        match self.lookup(keys) {
            None => false,
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s != "false",
            Some(_) => true,
        }
    }

    /// Base 10 integer with the same leniency as `parseInt`: leading whitespace and a sign are
    /// accepted and parsing stops at the first non-digit. `None` when no digits were found.
    pub fn int(&self, keys: &[&str]) -> Option<i64> {
        match self.lookup(keys)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
            Value::String(s) => parse_int_prefix(s),
            _ => None,
        }
    }

    /// Trimmed string value. Blank values count as absent.
    pub fn string(&self, keys: &[&str]) -> Option<String> {
        let value = match self.lookup(keys)? {
            Value::String(s) => s.trim().to_owned(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return None,
        };
        (!value.is_empty()).then_some(value)
    }
}

impl FromIterator<(String, String)> for OptionBag {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key, Value::String(value)))
                .collect(),
        )
    }
}

fn parse_int_prefix(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(digits.len(), |(i, _)| i);
    let value: i64 = digits.get(..end)?.parse().ok()?;
    Some(if negative { -value } else { value })
}

/// An id filter on `list items`, where the literals `null` and `notnull` are special.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum IdFilter {
    #[default]
    Any,
    Null,
    NotNull,
    Id(String),
}

impl IdFilter {
    fn from_option(value: Option<String>) -> Self {
        match value.as_deref() {
            None => IdFilter::Any,
            Some("null") => IdFilter::Null,
            Some("notnull") => IdFilter::NotNull,
            Some(id) => IdFilter::Id(id.to_lowercase()),
        }
    }

    pub fn is_set(&self) -> bool {
        *self != IdFilter::Any
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListOptions {
    pub search: Option<String>,
    pub url: Option<String>,
    pub folder_id: IdFilter,
    pub collection_id: IdFilter,
    pub organization_id: IdFilter,
    pub trash: bool,
}

impl ListOptions {
    pub fn from_bag(bag: &OptionBag) -> Self {
        Self {
            search: bag.string(SEARCH),
            url: bag.string(URL),
            folder_id: IdFilter::from_option(bag.string(FOLDER_ID)),
            collection_id: IdFilter::from_option(bag.string(COLLECTION_ID)),
            organization_id: IdFilter::from_option(bag.string(ORGANIZATION_ID)),
            trash: bag.flag(TRASH),
        }
    }

    /// The raw `--organizationid` value for org scoped listings.
    pub fn organization_id_raw(&self) -> Option<String> {
        match &self.organization_id {
            IdFilter::Any => None,
            IdFilter::Null => Some("null".to_owned()),
            IdFilter::NotNull => Some("notnull".to_owned()),
            IdFilter::Id(id) => Some(id.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GetOptions {
    pub item_id: Option<String>,
    pub output: Option<String>,
    pub organization_id: Option<String>,
}

impl GetOptions {
    pub fn from_bag(bag: &OptionBag) -> Self {
        Self {
            item_id: bag.string(ITEM_ID),
            output: bag.string(OUTPUT),
            organization_id: bag.string(ORGANIZATION_ID),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CreateOptions {
    pub file: Option<String>,
    pub item_id: Option<String>,
    pub organization_id: Option<String>,
}

impl CreateOptions {
    pub fn from_bag(bag: &OptionBag) -> Self {
        Self {
            file: bag.string(FILE),
            item_id: bag.string(ITEM_ID),
            organization_id: bag.string(ORGANIZATION_ID),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EditOptions {
    pub organization_id: Option<String>,
}

impl EditOptions {
    pub fn from_bag(bag: &OptionBag) -> Self {
        Self {
            organization_id: bag.string(ORGANIZATION_ID),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeleteOptions {
    pub item_id: Option<String>,
    pub organization_id: Option<String>,
    pub permanent: bool,
}

impl DeleteOptions {
    pub fn from_bag(bag: &OptionBag) -> Self {
        Self {
            item_id: bag.string(ITEM_ID),
            organization_id: bag.string(ORGANIZATION_ID),
            permanent: bag.flag(PERMANENT),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncOptions {
    pub force: bool,
    pub last: bool,
}

impl SyncOptions {
    pub fn from_bag(bag: &OptionBag) -> Self {
        Self {
            force: bag.flag(FORCE),
            last: bag.flag(LAST),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnlockOptions {
    pub password_env: Option<String>,
    pub password_file: Option<String>,
    pub check: bool,
}

impl UnlockOptions {
    pub fn from_bag(bag: &OptionBag) -> Self {
        Self {
            password_env: bag.string(&["passwordenv", "passwordEnv"]),
            password_file: bag.string(&["passwordfile", "passwordFile"]),
            check: bag.flag(&["check"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOptions {
    pub email: Option<String>,
    pub password: Option<String>,
    pub password_env: Option<String>,
    pub password_file: Option<String>,
}

impl LoginOptions {
    pub fn from_bag(bag: &OptionBag) -> Self {
        Self {
            email: bag.string(&["email"]),
            password: bag.string(&["password"]),
            password_env: bag.string(&["passwordenv", "passwordEnv"]),
            password_file: bag.string(&["passwordfile", "passwordFile"]),
        }
    }
}

pub const DEFAULT_PASSWORD_LENGTH: u8 = 14;
pub const MIN_PASSWORD_LENGTH: u8 = 5;
pub const MAX_PASSWORD_LENGTH: u8 = 128;
pub const DEFAULT_PASSPHRASE_WORDS: u8 = 3;
pub const MIN_PASSPHRASE_WORDS: u8 = 3;
pub const MAX_PASSPHRASE_WORDS: u8 = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateOptions {
    pub uppercase: bool,
    pub lowercase: bool,
    pub number: bool,
    pub special: bool,
    pub length: u8,
    pub passphrase: bool,
    pub words: u8,
    pub separator: String,
    pub capitalize: bool,
    pub include_number: bool,
}

impl GenerateOptions {
    pub fn from_bag(bag: &OptionBag) -> Self {
        let mut uppercase = bag.flag(&["uppercase"]);
        let mut lowercase = bag.flag(&["lowercase"]);
        let mut number = bag.flag(&["number"]);
        let special = bag.flag(&["special"]);
        if !uppercase && !lowercase && !number && !special {
            uppercase = true;
            lowercase = true;
            number = true;
        }

        let separator = match bag.string(&["separator"]).as_deref() {
            None => "-".to_owned(),
            Some("space") => " ".to_owned(),
            Some("empty") => String::new(),
            Some(s) => s.chars().next().map(String::from).unwrap_or_default(),
        };

        Self {
            uppercase,
            lowercase,
            number,
            special,
            length: clamp_u8(
                bag.int(&["length"]),
                DEFAULT_PASSWORD_LENGTH,
                MIN_PASSWORD_LENGTH,
                MAX_PASSWORD_LENGTH,
            ),
            passphrase: bag.flag(&["passphrase"]),
            words: clamp_u8(
                bag.int(&["words"]),
                DEFAULT_PASSPHRASE_WORDS,
                MIN_PASSPHRASE_WORDS,
                MAX_PASSPHRASE_WORDS,
            ),
            separator,
            capitalize: bag.flag(&["capitalize"]),
            include_number: bag.flag(&["includenumber", "includeNumber"]),
        }
    }

    pub fn password_request(&self) -> PasswordGeneratorRequest {
        PasswordGeneratorRequest {
            lowercase: self.lowercase,
            uppercase: self.uppercase,
            numbers: self.number,
            special: self.special,
            length: self.length,
        }
    }

    pub fn passphrase_request(&self) -> PassphraseGeneratorRequest {
        PassphraseGeneratorRequest {
            num_words: self.words,
            word_separator: self.separator.clone(),
            capitalize: self.capitalize,
            include_number: self.include_number,
        }
    }
}

fn clamp_u8(value: Option<i64>, default: u8, min: u8, max: u8) -> u8 {
    match value {
        None => default,
        Some(v) => u8::try_from(v.clamp(i64::from(min), i64::from(max))).unwrap_or(max),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SendGetOptions {
    pub text: bool,
    pub output: Option<String>,
}

impl SendGetOptions {
    pub fn from_bag(bag: &OptionBag) -> Self {
        Self {
            text: bag.flag(TEXT),
            output: bag.string(OUTPUT),
        }
    }
}

pub const DEFAULT_SEND_DELETE_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendCreateOptions {
    pub file: Option<String>,
    pub text: Option<String>,
    pub name: Option<String>,
    pub notes: Option<String>,
    pub delete_in_days: i64,
    pub max_access_count: Option<u32>,
    pub password: Option<String>,
    pub hidden: bool,
}

impl SendCreateOptions {
    pub fn from_bag(bag: &OptionBag) -> Self {
        Self {
            file: bag.string(FILE),
            text: bag.string(TEXT),
            name: bag.string(&["name"]),
            notes: bag.string(&["notes"]),
            delete_in_days: bag
                .int(&["deleteindays", "deleteInDays"])
                .filter(|days| *days > 0)
                .unwrap_or(DEFAULT_SEND_DELETE_DAYS),
            max_access_count: bag
                .int(&["maxaccesscount", "maxAccessCount"])
                .and_then(|count| u32::try_from(count).ok()),
            password: bag.string(&["password"]),
            // Unlike other switches, any value other than `false` hides the text.
            hidden: bag.presence_flag(&["hidden"]),
        }
    }
}
