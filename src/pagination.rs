use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

pub const DEFAULT_LIMIT: u64 = 100;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct Pagination {
    /// Values outside `1..=100` fall back to 100.
    #[param(default = 100, minimum = 1, maximum = 100)]
    pub limit: Option<i64>,
    /// Negative values fall back to 0.
    #[param(default = 0, minimum = 0)]
    pub offset: Option<i64>,
}

impl Pagination {
    pub fn limit(&self) -> u64 {
        match self.limit {
            Some(limit) if limit > 0 && limit as u64 <= DEFAULT_LIMIT => limit as u64,
            _ => DEFAULT_LIMIT,
        }
    }

    pub fn offset(&self) -> u64 {
        match self.offset {
            Some(offset) if offset > 0 => offset as u64,
            _ => 0,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total: u64, pagination: &Pagination) -> Self {
        Self {
            data,
            total,
            limit: pagination.limit(),
            offset: pagination.offset(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(limit: Option<i64>, offset: Option<i64>) -> Pagination {
        Pagination { limit, offset }
    }

    #[test]
    fn defaults_when_absent() {
        let p = page(None, None);
        assert_eq!((p.limit(), p.offset()), (100, 0));
    }

    #[test]
    fn out_of_range_limit_falls_back() {
        assert_eq!(page(Some(0), None).limit(), 100);
        assert_eq!(page(Some(-5), None).limit(), 100);
        assert_eq!(page(Some(101), None).limit(), 100);
        assert_eq!(page(Some(25), None).limit(), 25);
        assert_eq!(page(Some(100), None).limit(), 100);
    }

    #[test]
    fn negative_offset_falls_back_to_zero() {
        assert_eq!(page(None, Some(-1)).offset(), 0);
        assert_eq!(page(None, Some(40)).offset(), 40);
    }
}
