//! Domain DTOs for the GetResponse contacts API.
//!
//! # Design
//! Field names mirror the upstream wire contract exactly (camelCase). Every
//! optional field is an `Option` and is skipped on serialization when `None`,
//! because the API treats an explicit `null` differently from an absent key.
//! Collections are `Option<Vec<_>>` so "leave unchanged" and "clear" stay
//! distinguishable on updates.
//!
//! Timestamps (`createdOn`, `changedOn`) are kept as opaque strings: the API
//! does not document their timezone.

use std::collections::BTreeMap;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// Read an explicit JSON `null` as the type's default, like a missing key.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Reference to the campaign (list) a contact belongs to.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub campaign_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

impl Campaign {
    pub fn new(campaign_id: impl Into<String>) -> Self {
        Self {
            campaign_id: campaign_id.into(),
            ..Self::default()
        }
    }
}

/// A custom field value attached to a contact. The API always models values
/// as a list, even for single-valued fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CustomField {
    pub custom_field_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub value: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

impl CustomField {
    pub fn new<I, S>(custom_field_id: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            custom_field_id: custom_field_id.into(),
            value: values.into_iter().map(Into::into).collect(),
            href: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Geolocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continent_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dma_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub tag_id: String,
}

/// A subscriber record. Every field is optional on read; the server decides
/// which ones to return (see the `fields` selection on list/get).
///
/// The same type is sent as the body of an update, so only the fields that
/// are `Some` are touched on the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_cycle: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed_on: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign: Option<Campaign>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geolocation: Option<Geolocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Tag>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_field_values: Option<Vec<CustomField>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activities: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scoring: Option<i64>,
}

/// Request payload for creating a contact. Only `email` and the campaign id
/// are required by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewContact {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_cycle: Option<i32>,
    pub campaign: Campaign,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_field_values: Option<Vec<CustomField>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}

impl NewContact {
    pub fn new(email: impl Into<String>, campaign_id: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
            day_of_cycle: None,
            campaign: Campaign::new(campaign_id),
            custom_field_values: None,
            ip_address: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn day_of_cycle(mut self, day: i32) -> Self {
        self.day_of_cycle = Some(day);
        self
    }

    pub fn custom_fields(mut self, fields: Vec<CustomField>) -> Self {
        self.custom_field_values = Some(fields);
        self
    }

    pub fn ip_address(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }
}

/// Wrapper body for `POST /contacts/{id}/custom-fields`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CustomFieldsUpdate {
    pub custom_field_values: Vec<CustomField>,
}

const DEFAULT_PER_PAGE: NonZeroU32 = match NonZeroU32::new(100) {
    Some(n) => n,
    None => unreachable!(),
};

/// Parameters for `GET /contacts`.
///
/// Maps are ordered so the rendered query string is deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactQuery {
    pub filters: BTreeMap<String, String>,
    pub fields: Vec<String>,
    pub sort: BTreeMap<String, String>,
    pub page: NonZeroU32,
    pub per_page: NonZeroU32,
    pub additional_flags: Option<String>,
}

impl Default for ContactQuery {
    fn default() -> Self {
        Self {
            filters: BTreeMap::new(),
            fields: Vec::new(),
            sort: BTreeMap::new(),
            page: NonZeroU32::MIN,
            per_page: DEFAULT_PER_PAGE,
            additional_flags: None,
        }
    }
}

impl ContactQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }

    pub fn sort_by(mut self, key: impl Into<String>, direction: impl Into<String>) -> Self {
        self.sort.insert(key.into(), direction.into());
        self
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn page(mut self, page: NonZeroU32) -> Self {
        self.page = page;
        self
    }

    pub fn per_page(mut self, per_page: NonZeroU32) -> Self {
        self.per_page = per_page;
        self
    }

    pub fn additional_flags(mut self, flags: impl Into<String>) -> Self {
        self.additional_flags = Some(flags.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_custom_field_value_reads_as_empty() {
        let field: CustomField = serde_json::from_str(r#"{"customFieldId":"abc","value":null}"#).unwrap();
        assert_eq!(field.custom_field_id, "abc");
        assert!(field.value.is_empty());

        let contact: Contact =
            serde_json::from_str(r#"{"customFieldValues":[{"customFieldId":"abc","value":null}]}"#).unwrap();
        assert_eq!(contact.custom_field_values, Some(vec![CustomField::new("abc", Vec::<String>::new())]));
    }

    #[test]
    fn new_contact_omits_absent_optionals() {
        let input = NewContact::new("foo@bar.baz", "abc");
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"email": "foo@bar.baz", "campaign": {"campaignId": "abc"}})
        );
    }

    #[test]
    fn contact_default_serializes_to_empty_object() {
        let json = serde_json::to_string(&Contact::default()).unwrap();
        assert_eq!(json, "{}");
    }

    #[test]
    fn contact_keeps_empty_collections_distinct_from_absent() {
        let contact = Contact {
            tags: Some(Vec::new()),
            ..Contact::default()
        };
        let json = serde_json::to_value(&contact).unwrap();
        assert_eq!(json, serde_json::json!({"tags": []}));
    }

    #[test]
    fn contact_reads_full_upstream_payload() {
        let raw = r#"{
            "contactId": "pV3r",
            "href": "https://api.getresponse.com/v3/contacts/pV3r",
            "name": "John Doe",
            "email": "john.doe@example.com",
            "note": "vip",
            "dayOfCycle": 42,
            "origin": "api",
            "createdOn": "2014-02-12T15:19:21+0000",
            "changedOn": "2014-02-12T15:19:21+0000",
            "campaign": {"campaignId": "V", "name": "Promo", "href": "https://api.getresponse.com/v3/campaigns/V"},
            "geolocation": {"latitude": "54.3976", "longitude": "18.6235", "countryCode": "PL", "city": "Gdansk"},
            "tags": [{"tagId": "Xd"}],
            "customFieldValues": [{"customFieldId": "n", "value": ["white"]}],
            "timeZone": "Europe/Warsaw",
            "ipAddress": "89.206.36.193",
            "activities": "https://api.getresponse.com/v3/contacts/pV3r/activities",
            "scoring": 8
        }"#;
        let contact: Contact = serde_json::from_str(raw).unwrap();
        assert_eq!(contact.contact_id.as_deref(), Some("pV3r"));
        assert_eq!(contact.day_of_cycle, Some(42));
        assert_eq!(contact.campaign.as_ref().unwrap().campaign_id, "V");
        assert_eq!(
            contact.geolocation.as_ref().unwrap().country_code.as_deref(),
            Some("PL")
        );
        assert_eq!(contact.tags.as_ref().unwrap()[0].tag_id, "Xd");
        assert_eq!(
            contact.custom_field_values.unwrap()[0].value,
            vec!["white".to_string()]
        );
        assert_eq!(contact.scoring, Some(8));
    }

    #[test]
    fn custom_field_requires_id() {
        let result: Result<CustomField, _> = serde_json::from_str(r#"{"value":["x"]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn contact_query_defaults() {
        let query = ContactQuery::new();
        assert_eq!(query.page.get(), 1);
        assert_eq!(query.per_page.get(), 100);
        assert!(query.filters.is_empty());
        assert!(query.additional_flags.is_none());
    }
}
