use uuid::Uuid;

/// The kinds of resources that get a locally minted `https://{domain}/{kind}/{uuid}` id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    User,
    Note,
    Activity,
    Follow,
}

impl Kind {
    fn segment(self) -> &'static str {
        match self {
            Kind::User => "user",
            Kind::Note => "note",
            Kind::Activity => "activity",
            Kind::Follow => "follow",
        }
    }
}

/// Mints a new locally owned ActivityPub id: `https://{domain}/{kind}/{uuidv7}`.
///
/// UUIDv7 is time-ordered, so ids sort chronologically without a separate
/// sequence column.
pub fn mint(domain: &str, kind: Kind) -> String {
    format!("https://{domain}/{}/{}", kind.segment(), Uuid::now_v7())
}

/// Extracts the domain component out of one of our own ids, for building
/// the `followers`/`inbox` derived URLs of a freshly created local actor.
pub fn domain_of(id: &str) -> Option<&str> {
    id.strip_prefix("https://")
        .or_else(|| id.strip_prefix("http://"))
        .and_then(|rest| rest.split('/').next())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mints_well_formed_ids() {
        let id = mint("example.social", Kind::Note);
        assert!(id.starts_with("https://example.social/note/"));
        let uuid_part = id.rsplit('/').next().unwrap();
        assert!(Uuid::parse_str(uuid_part).is_ok());
    }

    #[test]
    fn extracts_domain() {
        assert_eq!(
            domain_of("https://example.social/user/abc"),
            Some("example.social")
        );
    }
}
