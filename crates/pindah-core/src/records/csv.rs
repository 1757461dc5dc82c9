//! CSV field layout per entity kind.
//!
//! The header rows are part of the external format: they are written
//! verbatim on export and required (then discarded) on import.

use crate::error::RecordError;
use crate::metadata;
use crate::Result;

use super::types::{Channel, Connection, EntityKind, Thing, User};

/// An entity with a fixed CSV column layout.
pub trait CsvEntity: Sized + Send + 'static {
    /// The kind of this entity, used for operation naming.
    const KIND: EntityKind;

    /// The literal header row.
    const HEADER: &'static [&'static str];

    /// Render this record as one CSV row, in header order.
    fn to_fields(&self) -> Result<Vec<String>>;

    /// Decode one CSV row, in header order.
    fn from_fields(fields: &[String]) -> Result<Self>;
}

fn expect_fields(fields: &[String], expected: usize) -> Result<()> {
    if fields.len() != expected {
        return Err(RecordError::FieldCount {
            expected,
            found: fields.len(),
        }
        .into());
    }
    Ok(())
}

impl CsvEntity for User {
    const KIND: EntityKind = EntityKind::Users;
    const HEADER: &'static [&'static str] = &["ID", "Email", "Password", "Metadata"];

    fn to_fields(&self) -> Result<Vec<String>> {
        Ok(vec![
            self.id.clone(),
            self.email.clone(),
            self.password.clone(),
            metadata::encode(&self.metadata)?,
        ])
    }

    fn from_fields(fields: &[String]) -> Result<Self> {
        expect_fields(fields, 4)?;
        Ok(User {
            id: fields[0].clone(),
            email: fields[1].clone(),
            password: fields[2].clone(),
            metadata: metadata::decode(&fields[3])?,
        })
    }
}

impl CsvEntity for Thing {
    const KIND: EntityKind = EntityKind::Things;
    const HEADER: &'static [&'static str] = &["ID", "Key", "Name", "Owner", "Metadata"];

    fn to_fields(&self) -> Result<Vec<String>> {
        Ok(vec![
            self.id.clone(),
            self.key.clone(),
            self.name.clone(),
            self.owner.clone(),
            metadata::encode(&self.metadata)?,
        ])
    }

    fn from_fields(fields: &[String]) -> Result<Self> {
        expect_fields(fields, 5)?;
        Ok(Thing {
            id: fields[0].clone(),
            key: fields[1].clone(),
            name: fields[2].clone(),
            owner: fields[3].clone(),
            metadata: metadata::decode(&fields[4])?,
        })
    }
}

impl CsvEntity for Channel {
    const KIND: EntityKind = EntityKind::Channels;
    const HEADER: &'static [&'static str] = &["ID", "Name", "Owner", "Metadata"];

    fn to_fields(&self) -> Result<Vec<String>> {
        Ok(vec![
            self.id.clone(),
            self.name.clone(),
            self.owner.clone(),
            metadata::encode(&self.metadata)?,
        ])
    }

    fn from_fields(fields: &[String]) -> Result<Self> {
        expect_fields(fields, 4)?;
        Ok(Channel {
            id: fields[0].clone(),
            name: fields[1].clone(),
            owner: fields[2].clone(),
            metadata: metadata::decode(&fields[3])?,
        })
    }
}

impl CsvEntity for Connection {
    const KIND: EntityKind = EntityKind::Connections;
    const HEADER: &'static [&'static str] = &["ChannelID", "ChannelOwner", "ThingID", "ThingOwner"];

    fn to_fields(&self) -> Result<Vec<String>> {
        Ok(vec![
            self.channel_id.clone(),
            self.channel_owner.clone(),
            self.thing_id.clone(),
            self.thing_owner.clone(),
        ])
    }

    fn from_fields(fields: &[String]) -> Result<Self> {
        expect_fields(fields, 4)?;
        Ok(Connection {
            channel_id: fields[0].clone(),
            channel_owner: fields[1].clone(),
            thing_id: fields[2].clone(),
            thing_owner: fields[3].clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn thing_round_trip() {
        let mut metadata = crate::Metadata::new();
        metadata.insert("model".to_string(), json!("dht22"));

        let thing = Thing {
            id: "t1".to_string(),
            owner: "alice@example.com".to_string(),
            name: "sensor".to_string(),
            key: "secret".to_string(),
            metadata,
        };

        let fields = thing.to_fields().unwrap();
        assert_eq!(fields[0], "t1");
        assert_eq!(fields[1], "secret");
        assert_eq!(fields[2], "sensor");
        assert_eq!(fields[3], "alice@example.com");
        assert_eq!(Thing::from_fields(&fields).unwrap(), thing);
    }

    #[test]
    fn user_with_empty_metadata() {
        let user = User {
            id: "u1".to_string(),
            email: "u1@example.com".to_string(),
            password: "pw".to_string(),
            metadata: crate::Metadata::new(),
        };
        let fields = user.to_fields().unwrap();
        assert_eq!(fields[3], "");
        assert_eq!(User::from_fields(&fields).unwrap(), user);
    }

    #[test]
    fn wrong_field_count_is_an_error() {
        let short = vec!["c1".to_string(), "alice".to_string()];
        assert!(Connection::from_fields(&short).is_err());
    }
}
