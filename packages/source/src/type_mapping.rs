//! Category label to short display type.

/// Category used when a record has none.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Maps a feed category label to the short type shown in list views and
/// map popups. Unmapped categories are shown as-is.
#[must_use]
pub fn kind_for_category(category: &str) -> &str {
    match category {
        "Traffic & Transportation" => "Traffic",
        "Administrative Announcements" => "Administrative",
        "Weather & Environment" => "Weather",
        "Public Safety" => "Emergency",
        "Infrastructure" => "Construction",
        "Health & Medical" => "Medical",
        "Education" => "Educational",
        "Technology" => "Tech Issue",
        other => other,
    }
}
