use chrono::{Duration, SecondsFormat, Utc};
use clap::ValueEnum;
use serde_json::{Value, json};

use crate::{
    options::DEFAULT_SEND_DELETE_DAYS,
    response::{CommandError, CommandResult, Response, ResponseData},
};

const EMPTY_GUID: &str = "00000000-0000-0000-0000-000000000000";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TemplateObject {
    #[value(name = "item")]
    Item,
    #[value(name = "item.field")]
    ItemField,
    #[value(name = "item.login")]
    ItemLogin,
    #[value(name = "item.login.uri")]
    ItemLoginUri,
    #[value(name = "item.card")]
    ItemCard,
    #[value(name = "item.identity")]
    ItemIdentity,
    #[value(name = "item.securenote")]
    ItemSecureNote,
    #[value(name = "folder")]
    Folder,
    #[value(name = "collection")]
    Collection,
    #[value(name = "item-collections")]
    ItemCollections,
    #[value(name = "org-collection")]
    OrgCollection,
    #[value(name = "send.text")]
    SendText,
    #[value(name = "send.file")]
    SendFile,
}

impl TemplateObject {
    pub fn template(self) -> Value {
        match self {
            Self::Item => json!({
                "organizationId": null,
                "collectionIds": null,
                "folderId": null,
                "type": 1,
                "name": "Item name",
                "notes": "Some notes about this item.",
                "favorite": false,
                "fields": [],
                "login": null,
                "secureNote": null,
                "card": null,
                "identity": null,
                "reprompt": 0,
            }),
            Self::ItemField => json!({
                "name": "Field name",
                "value": "Some value",
                "type": 0,
            }),
            Self::ItemLogin => json!({
                "uris": [],
                "username": "jdoe",
                "password": "myp@ssword123",
                "totp": "JBSWY3DPEHPK3PXP",
            }),
            Self::ItemLoginUri => json!({
                "match": null,
                "uri": "https://google.com",
            }),
            Self::ItemCard => json!({
                "cardholderName": "John Doe",
                "brand": "visa",
                "number": "4242424242424242",
                "expMonth": "04",
                "expYear": "2023",
                "code": "123",
            }),
            Self::ItemIdentity => json!({
                "title": "Mr",
                "firstName": "John",
                "middleName": "William",
                "lastName": "Doe",
                "address1": "123 Any St",
                "address2": "Apt #123",
                "address3": null,
                "city": "New York",
                "state": "NY",
                "postalCode": "10001",
                "country": "US",
                "company": "Acme Inc.",
                "email": "john@company.com",
                "phone": "5555551234",
                "ssn": "000-123-4567",
                "username": "jdoe",
                "passportNumber": "US-123456789",
                "licenseNumber": "D123-12-123-12333",
            }),
            Self::ItemSecureNote => json!({ "type": 0 }),
            Self::Folder => json!({ "name": "Folder name" }),
            Self::Collection => json!({
                "organizationId": EMPTY_GUID,
                "name": "Collection name",
                "externalId": null,
            }),
            Self::ItemCollections => json!([EMPTY_GUID]),
            Self::OrgCollection => json!({
                "organizationId": EMPTY_GUID,
                "name": "Collection name",
                "externalId": null,
                "groups": [selection()],
                "users": [selection()],
            }),
            Self::SendText => send_template(
                0,
                json!({ "text": "Text contained in the send.", "hidden": false }),
                Value::Null,
            ),
            Self::SendFile => send_template(
                1,
                Value::Null,
                json!({ "fileName": "file attachment location" }),
            ),
        }
    }
}

fn selection() -> Value {
    json!({
        "id": EMPTY_GUID,
        "readOnly": false,
        "hidePasswords": false,
        "manage": false,
    })
}

fn send_template(r#type: u8, text: Value, file: Value) -> Value {
    let deletion_date = Utc::now() + Duration::days(DEFAULT_SEND_DELETE_DAYS);
    json!({
        "name": "Send name",
        "notes": "Some notes about this send.",
        "type": r#type,
        "text": text,
        "file": file,
        "maxAccessCount": null,
        "deletionDate": deletion_date.to_rfc3339_opts(SecondsFormat::Millis, true),
        "expirationDate": null,
        "password": null,
        "disabled": false,
        "hideEmail": false,
    })
}

pub(crate) fn get(name: &str) -> CommandResult {
    let object = TemplateObject::from_str(name.trim(), true)
        .map_err(|_| CommandError::bad_request("Unknown template object."))?;

    Ok(Response::success_with(ResponseData::Template {
        template: object.template(),
    }))
}
