//! Session identity generation.

use uuid::Uuid;

use beacon_core::{BeaconResult, SessionId};

/// Produces one identity per monitoring session.
pub trait IdentityProvider: Send + Sync {
    fn generate(&self) -> BeaconResult<SessionId>;
}

/// Time-ordered UUIDv7 identities.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidV7;

impl IdentityProvider for UuidV7 {
    fn generate(&self) -> BeaconResult<SessionId> {
        Ok(SessionId::new(Uuid::now_v7().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn generates_version_7() {
        let id = UuidV7.generate().unwrap();
        let parsed = Uuid::parse_str(id.as_str()).unwrap();
        assert_eq!(parsed.get_version_num(), 7);
    }

    #[test]
    fn identities_are_unique_and_time_ordered() {
        let first = UuidV7.generate().unwrap();
        std::thread::sleep(Duration::from_millis(2));
        let second = UuidV7.generate().unwrap();

        assert_ne!(first, second);
        assert!(first < second);
    }
}
