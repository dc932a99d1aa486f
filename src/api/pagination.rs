use serde::Serialize;

/// Largest page any listing returns.
pub(crate) const MAX_LIMIT: i64 = 1000;

pub(crate) const fn default_limit() -> i64 {
    100
}

/// One page of a listing plus the size of the whole result set.
#[derive(Debug, Serialize)]
pub(crate) struct PaginatedResponse<T> {
    pub(crate) items: Vec<T>,
    pub(crate) total_count: i64,
    pub(crate) skip: i64,
    pub(crate) limit: i64,
}

impl<T> PaginatedResponse<T> {
    /// Echoes `skip`/`limit` back the way the repositories apply them.
    pub(crate) fn new(items: Vec<T>, total_count: i64, skip: i64, limit: i64) -> Self {
        Self { items, total_count, skip: skip.max(0), limit: limit.clamp(1, MAX_LIMIT) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_bounds_are_normalised() {
        let page = PaginatedResponse::new(vec![1, 2], 40, -5, 0);
        assert_eq!((page.skip, page.limit, page.total_count), (0, 1, 40));

        let page = PaginatedResponse::<i32>::new(Vec::new(), 0, 10, 5000);
        assert_eq!(page.limit, MAX_LIMIT);
    }
}
