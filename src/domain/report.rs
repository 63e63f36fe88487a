use serde::{Deserialize, Serialize};

/// Created/updated/failed tallies of one processing batch (or a whole run).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub created: u64,
    pub updated: u64,
    pub failed: u64,
}

impl BatchReport {
    pub fn absorb(&mut self, other: &BatchReport) {
        self.created += other.created;
        self.updated += other.updated;
        self.failed += other.failed;
    }

    pub fn is_empty(&self) -> bool {
        self.created == 0 && self.updated == 0 && self.failed == 0
    }
}

impl std::fmt::Display for BatchReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} failed",
            self.created, self.updated, self.failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absorb_and_format() {
        let mut total = BatchReport::default();
        assert!(total.is_empty());

        total.absorb(&BatchReport { created: 2, updated: 0, failed: 1 });
        total.absorb(&BatchReport { created: 1, updated: 3, failed: 0 });

        assert_eq!(total.to_string(), "3 created, 3 updated, 1 failed");
    }
}
