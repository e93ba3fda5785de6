//! Regional BLB endpoints.

/// Known region short names and their API hosts.
const REGION_ENDPOINTS: &[(&str, &str)] = &[
    ("bj", "blb.bj.baidubce.com"),
    ("gz", "blb.gz.baidubce.com"),
    ("su", "blb.su.baidubce.com"),
    ("hk", "blb.hkg.baidubce.com"),
    ("bd", "blb.bd.baidubce.com"),
];

/// Return the API host for a region, if the region is known.
pub fn region_endpoint(region: &str) -> Option<&'static str> {
    REGION_ENDPOINTS
        .iter()
        .find(|(name, _)| *name == region)
        .map(|(_, host)| *host)
}
