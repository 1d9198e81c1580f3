use serde::{Deserialize, Serialize};

/// Column a catalog query sorts by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    /// Filesystem creation date of the underlying file.
    #[default]
    #[serde(rename = "file_creation_date")]
    FileCreatedAt,
    PatientName,
    /// When the record entered the catalog.
    CreatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// One page of query results plus the total match count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub total: i64,
    pub results: Vec<T>,
    pub limit: i64,
    pub offset: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_field_wire_names() {
        // The viewer frontend sends these exact strings.
        assert_eq!(
            serde_json::from_str::<SortField>("\"file_creation_date\"").unwrap(),
            SortField::FileCreatedAt
        );
        assert_eq!(
            serde_json::from_str::<SortField>("\"patient_name\"").unwrap(),
            SortField::PatientName
        );
        assert_eq!(
            serde_json::from_str::<SortField>("\"created_at\"").unwrap(),
            SortField::CreatedAt
        );
        assert_eq!(
            serde_json::from_str::<SortOrder>("\"desc\"").unwrap(),
            SortOrder::Desc
        );
    }
}
