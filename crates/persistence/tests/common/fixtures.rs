//! Fixture rows shared by the integration tests.
//!
//! ```text
//! root (1)
//! ├── cdn-a (2)
//! │   └── cdn-a-edge (3)
//! ├── cdn-b (4)
//! └── retired (5, inactive)
//! ```
//!
//! Delivery services: demo1 (tenant 2), demo2 (tenant 3), other (tenant 4),
//! shared (no tenant), legacy (tenant 5).

pub const ROOT: i64 = 1;
pub const CDN_A: i64 = 2;
pub const CDN_A_EDGE: i64 = 3;
pub const CDN_B: i64 = 4;
pub const RETIRED: i64 = 5;

pub const DS_DEMO1: i64 = 1;
pub const DS_DEMO2: i64 = 2;
pub const DS_OTHER: i64 = 3;
pub const DS_SHARED: i64 = 4;
pub const DS_LEGACY: i64 = 5;

/// Federation "foo".
pub const FED_FOO: i64 = 5;
/// Federation "bar".
pub const FED_BAR: i64 = 6;

pub const FIXTURES: &str = "
INSERT INTO tenant (id, name, active, parent_id) VALUES
    (2, 'cdn-a', 1, 1),
    (3, 'cdn-a-edge', 1, 2),
    (4, 'cdn-b', 1, 1),
    (5, 'retired', 0, 1);

INSERT INTO deliveryservice (id, xml_id, tenant_id) VALUES
    (1, 'demo1', 2),
    (2, 'demo2', 3),
    (3, 'other', 4),
    (4, 'shared', NULL),
    (5, 'legacy', 5);

INSERT INTO server_capability (name) VALUES
    ('ram'),
    ('disk'),
    ('ssd'),
    ('bulk-ssl');

INSERT INTO federation (id, cname, ttl) VALUES
    (5, 'foo', 60),
    (6, 'bar', 60);

INSERT INTO federation_resolver (id, ip_address, type) VALUES
    (10, '192.0.2.10', 'RESOLVE4'),
    (11, '192.0.2.11', 'RESOLVE4'),
    (12, '198.51.100.0/24', 'RESOLVE4'),
    (20, '2001:db8::20', 'RESOLVE6');
";
