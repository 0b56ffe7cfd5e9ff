use kindred_core::record_fields;

/// Tracked child row used across collection tests
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Note {
    pub id: String,
    pub parent_id: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub body: String,
    pub pinned: bool,
}

record_fields!(tracked Note { body: String, pinned: bool });

#[allow(dead_code)]
pub fn note(body: &str) -> Note {
    Note {
        body: body.to_string(),
        ..Default::default()
    }
}
