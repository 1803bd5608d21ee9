//! Mood photos and the condition-code buckets that select them

use serde::{Deserialize, Serialize};

/// A stock photo with attribution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoData {
    pub photographer: String,
    /// Photo page on the provider's site
    pub page_url: String,
    pub original: String,
    pub portrait: String,
    pub landscape: String,
}

/// Photo collection a weather condition is illustrated with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhotoBucket {
    Storm,
    Rain,
    Snow,
    Mist,
    Clouds,
    Clear,
}

impl PhotoBucket {
    /// Map a provider condition code to a bucket. Total over `i32`.
    #[must_use]
    pub fn from_condition_code(code: i32) -> Self {
        match code {
            200..=299 => PhotoBucket::Storm,
            300..=599 => PhotoBucket::Rain,
            600..=699 => PhotoBucket::Snow,
            700..=799 => PhotoBucket::Mist,
            801..=899 => PhotoBucket::Clouds,
            _ => PhotoBucket::Clear,
        }
    }

    /// Photo provider collection id for this bucket
    #[must_use]
    pub fn collection_id(&self) -> &'static str {
        match self {
            PhotoBucket::Storm => "bpoijxy",
            PhotoBucket::Rain => "hlfvh66",
            PhotoBucket::Snow => "2k6ae11",
            PhotoBucket::Mist => "o7j0pjq",
            PhotoBucket::Clouds => "9o3bjjb",
            PhotoBucket::Clear => "9ouwlqp",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(i32::MIN, PhotoBucket::Clear)]
    #[case(-1, PhotoBucket::Clear)]
    #[case(199, PhotoBucket::Clear)]
    #[case(200, PhotoBucket::Storm)]
    #[case(299, PhotoBucket::Storm)]
    #[case(300, PhotoBucket::Rain)]
    #[case(500, PhotoBucket::Rain)]
    #[case(599, PhotoBucket::Rain)]
    #[case(600, PhotoBucket::Snow)]
    #[case(699, PhotoBucket::Snow)]
    #[case(700, PhotoBucket::Mist)]
    #[case(799, PhotoBucket::Mist)]
    #[case(800, PhotoBucket::Clear)]
    #[case(801, PhotoBucket::Clouds)]
    #[case(899, PhotoBucket::Clouds)]
    #[case(900, PhotoBucket::Clear)]
    #[case(i32::MAX, PhotoBucket::Clear)]
    fn test_condition_code_buckets(#[case] code: i32, #[case] expected: PhotoBucket) {
        assert_eq!(PhotoBucket::from_condition_code(code), expected);
    }

    #[test]
    fn test_mapping_is_deterministic() {
        for code in -1000..2000 {
            assert_eq!(
                PhotoBucket::from_condition_code(code),
                PhotoBucket::from_condition_code(code)
            );
        }
    }

    #[test]
    fn test_collection_ids_are_distinct() {
        let buckets = [
            PhotoBucket::Storm,
            PhotoBucket::Rain,
            PhotoBucket::Snow,
            PhotoBucket::Mist,
            PhotoBucket::Clouds,
            PhotoBucket::Clear,
        ];
        let mut ids: Vec<&str> = buckets.iter().map(PhotoBucket::collection_id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), buckets.len());
    }
}
