#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Unit {
    pub id: i64,
    pub community_id: i64,
    pub unit_number: String,
}

/// Unit joined with its community name, as needed by the report endpoint.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UnitDetails {
    pub id: i64,
    pub community_id: i64,
    pub unit_number: String,
    pub community_name: String,
}
