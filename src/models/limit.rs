use tracing::debug;

pub const DEFAULT_LIMIT: i64 = 50;
pub const MAX_LIMIT: i64 = 200;

/// Bounds applied to the `limit` query parameter of a listing.
///
/// `default` is used for absent, unparsable or non-positive requests and
/// `ceiling` is never exceeded. `1 <= default <= ceiling` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitPolicy {
    default: i64,
    ceiling: i64,
}

impl Default for LimitPolicy {
    fn default() -> Self {
        Self {
            default: DEFAULT_LIMIT,
            ceiling: MAX_LIMIT,
        }
    }
}

impl LimitPolicy {
    pub fn new(default: i64, ceiling: i64) -> Self {
        let ceiling = ceiling.max(1);
        Self {
            default: default.clamp(1, ceiling),
            ceiling,
        }
    }

    pub const fn default_limit(&self) -> i64 {
        self.default
    }

    pub const fn ceiling(&self) -> i64 {
        self.ceiling
    }

    pub fn resolve(&self, requested: Option<&str>) -> i64 {
        let parsed = requested.and_then(|raw| raw.trim().parse::<i64>().ok());
        let limit = match parsed {
            Some(n) if n > 0 => n.min(self.ceiling),
            _ => self.default,
        };
        debug!(?requested, limit, "Resolved list limit");
        limit
    }
}
