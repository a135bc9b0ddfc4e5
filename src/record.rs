//! The unit of input: one occurrence of a key with its count.

/// A `(key, count)` pair as produced by the ingestion adapter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub key: String,
    pub count: u64,
}

impl Record {
    pub fn new(key: impl Into<String>, count: u64) -> Record {
        return Record {
            key: key.into(),
            count,
        };
    }
}

impl<K: Into<String>> From<(K, u64)> for Record {
    fn from((key, count): (K, u64)) -> Record {
        return Record::new(key, count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_tuple() {
        let record: Record = ("Texas", 100).into();
        assert_eq!(record, Record::new("Texas".to_string(), 100));
    }
}
