//! Common types used across the G-NAF loader

use crate::error::{GnafError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Instruction tag carried by messages that ask for a file import.
pub const IMPORT_FILE: &str = "import_file";

/// File extension of the raw G-NAF data files.
pub const PSV_EXTENSION: &str = "psv";

/// Schema every G-NAF table lives in.
pub const GNAF_SCHEMA: &str = "public";

/// File name prefixes of the per-state data files.
const STATE_PREFIXES: [&str; 9] = [
    "ACT_", "NSW_", "NT_", "OT_", "QLD_", "SA_", "TAS_", "VIC_", "WA_",
];

/// File name prefix of the authority code (lookup) files.
const AUTHORITY_CODE_PREFIX: &str = "Authority_Code_";

// ============================================================================
// Object References
// ============================================================================

/// A blob in object storage, identified by bucket and key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

impl ObjectRef {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Last path segment of the key (empty for folder markers)
    pub fn file_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }

    /// Folder markers are zero-byte keys ending in `/` that some tools create
    pub fn is_folder_marker(&self) -> bool {
        self.key.ends_with('/')
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// Join a folder prefix and a name with exactly one `/` between them.
pub fn join_key(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let name = name.trim_start_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

// ============================================================================
// Table Names
// ============================================================================

/// A validated, optionally schema-qualified table name.
///
/// Every part is an unquoted SQL identifier (`[A-Za-z_][A-Za-z0-9_]*`), so
/// [`TableName::quoted`] can be spliced into a statement safely.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName {
    schema: Option<String>,
    name: String,
}

impl TableName {
    /// Build a `schema.name` table, validating both parts
    pub fn qualified(schema: &str, name: &str) -> Result<Self> {
        if !is_identifier(schema) || !is_identifier(name) {
            return Err(GnafError::InvalidTableName(format!("{}.{}", schema, name)));
        }
        Ok(Self {
            schema: Some(schema.to_string()),
            name: name.to_string(),
        })
    }

    /// Derive the destination table of a G-NAF data file from its object key.
    ///
    /// `G-NAF/Standard/NSW_ADDRESS_DETAIL_psv.psv` maps to
    /// `public.address_detail` and
    /// `G-NAF/Authority Code/Authority_Code_FLAT_TYPE_AUT_psv.psv` to
    /// `public.flat_type_aut`.
    pub fn from_object_key(key: &str) -> Result<Self> {
        let file_name = key.rsplit('/').next().unwrap_or(key);

        let stem = file_name
            .strip_suffix("_psv.psv")
            .or_else(|| file_name.strip_suffix(".psv"))
            .ok_or_else(|| GnafError::UnmappedKey(key.to_string()))?;

        let stem = match stem.strip_prefix(AUTHORITY_CODE_PREFIX) {
            Some(rest) => rest,
            None => STATE_PREFIXES
                .iter()
                .find_map(|prefix| stem.strip_prefix(prefix))
                .unwrap_or(stem),
        };

        Self::qualified(GNAF_SCHEMA, &stem.to_lowercase())
            .map_err(|_| GnafError::UnmappedKey(key.to_string()))
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Double-quoted form for use in SQL statements
    pub fn quoted(&self) -> String {
        match &self.schema {
            Some(schema) => format!("\"{}\".\"{}\"", schema, self.name),
            None => format!("\"{}\"", self.name),
        }
    }
}

impl FromStr for TableName {
    type Err = GnafError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || GnafError::InvalidTableName(s.to_string());

        match s.split('.').collect::<Vec<_>>().as_slice() {
            [name] if is_identifier(name) => Ok(Self {
                schema: None,
                name: (*name).to_string(),
            }),
            [schema, name] => Self::qualified(schema, name).map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        },
        _ => false,
    }
}

// ============================================================================
// Queue Messages
// ============================================================================

/// Details block of an import message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportDetails {
    pub destination_table: String,
}

/// Body of an `import_file` message: load one object into one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportFile {
    pub bucket_name: String,
    pub key_name: String,
    pub details: ImportDetails,
}

impl ImportFile {
    pub fn new(bucket: &str, key: &str, table: &TableName) -> Self {
        Self {
            bucket_name: bucket.to_string(),
            key_name: key.to_string(),
            details: ImportDetails {
                destination_table: table.to_string(),
            },
        }
    }

    pub fn object(&self) -> ObjectRef {
        ObjectRef::new(&self.bucket_name, &self.key_name)
    }

    pub fn destination_table(&self) -> Result<TableName> {
        self.details.destination_table.parse()
    }

    /// Serialize with the `instruction` tag in front of the payload
    pub fn to_json(&self) -> Result<String> {
        #[derive(Serialize)]
        struct Tagged<'a> {
            instruction: &'a str,
            #[serde(flatten)]
            body: &'a ImportFile,
        }

        Ok(serde_json::to_string(&Tagged {
            instruction: IMPORT_FILE,
            body: self,
        })?)
    }
}

/// A parsed queue message body.
///
/// Only the `instruction` field is required up front; the rest of the body is
/// interpreted according to the instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    ImportFile(ImportFile),
    Unrecognized(String),
}

impl Instruction {
    pub fn parse(body: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct Envelope {
            instruction: String,
            #[serde(flatten)]
            payload: serde_json::Map<String, serde_json::Value>,
        }

        let envelope: Envelope = serde_json::from_str(body)?;

        if envelope.instruction == IMPORT_FILE {
            let import = serde_json::from_value(serde_json::Value::Object(envelope.payload))?;
            Ok(Instruction::ImportFile(import))
        } else {
            Ok(Instruction::Unrecognized(envelope.instruction))
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            Instruction::ImportFile(_) => IMPORT_FILE,
            Instruction::Unrecognized(tag) => tag,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_object_ref_file_name() {
        let object = ObjectRef::new("bucket", "G-NAF/Standard/ACT_STATE_psv.psv");
        assert_eq!(object.file_name(), "ACT_STATE_psv.psv");
        assert_eq!(object.to_string(), "bucket/G-NAF/Standard/ACT_STATE_psv.psv");
        assert!(!object.is_folder_marker());

        let folder = ObjectRef::new("bucket", "G-NAF/Standard/");
        assert_eq!(folder.file_name(), "");
        assert!(folder.is_folder_marker());
    }

    #[test]
    fn test_join_key() {
        assert_eq!(join_key("unzipped", "abc"), "unzipped/abc");
        assert_eq!(join_key("unzipped/", "/abc"), "unzipped/abc");
        assert_eq!(join_key("", "abc"), "abc");
    }

    #[test]
    fn test_table_name_from_str() {
        let table: TableName = "public.address_detail".parse().unwrap();
        assert_eq!(table.schema(), Some("public"));
        assert_eq!(table.name(), "address_detail");
        assert_eq!(table.quoted(), "\"public\".\"address_detail\"");

        let bare: TableName = "t1".parse().unwrap();
        assert_eq!(bare.schema(), None);
        assert_eq!(bare.quoted(), "\"t1\"");
        assert_eq!(bare.to_string(), "t1");
    }

    #[test]
    fn test_table_name_rejects_injection() {
        assert!("public.address; DROP TABLE state".parse::<TableName>().is_err());
        assert!("a.b.c".parse::<TableName>().is_err());
        assert!("1table".parse::<TableName>().is_err());
        assert!("\"quoted\"".parse::<TableName>().is_err());
        assert!("".parse::<TableName>().is_err());
    }

    #[test]
    fn test_table_from_state_file() {
        let table =
            TableName::from_object_key("G-NAF/G-NAF FEBRUARY 2020/Standard/NSW_ADDRESS_DETAIL_psv.psv")
                .unwrap();
        assert_eq!(table.to_string(), "public.address_detail");

        let table = TableName::from_object_key("WA_STREET_LOCALITY_ALIAS_psv.psv").unwrap();
        assert_eq!(table.to_string(), "public.street_locality_alias");

        let table = TableName::from_object_key("NT_MB_2016_psv.psv").unwrap();
        assert_eq!(table.to_string(), "public.mb_2016");
    }

    #[test]
    fn test_table_from_authority_code_file() {
        let table = TableName::from_object_key(
            "G-NAF/G-NAF FEBRUARY 2020/Authority Code/Authority_Code_FLAT_TYPE_AUT_psv.psv",
        )
        .unwrap();
        assert_eq!(table.to_string(), "public.flat_type_aut");
    }

    #[test]
    fn test_table_from_unmapped_key() {
        assert!(matches!(
            TableName::from_object_key("G-NAF/README.txt"),
            Err(GnafError::UnmappedKey(_))
        ));
        assert!(TableName::from_object_key("G-NAF/My File_psv.psv").is_err());
    }

    #[test]
    fn test_import_file_to_json() {
        let table: TableName = "public.state".parse().unwrap();
        let json = ImportFile::new("b", "k1", &table).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(
            value,
            serde_json::json!({
                "instruction": "import_file",
                "bucket_name": "b",
                "key_name": "k1",
                "details": {"destination_table": "public.state"}
            })
        );
    }

    #[test]
    fn test_parse_import_instruction() {
        let body = r#"{"instruction": "import_file", "bucket_name": "b", "key_name": "k1", "details": {"destination_table": "t1"}}"#;

        match Instruction::parse(body).unwrap() {
            Instruction::ImportFile(import) => {
                assert_eq!(import.object(), ObjectRef::new("b", "k1"));
                assert_eq!(import.destination_table().unwrap().to_string(), "t1");
            },
            other => panic!("unexpected instruction: {:?}", other),
        }
    }

    #[test]
    fn test_parse_unrecognized_instruction() {
        let instruction = Instruction::parse(r#"{"instruction": "noop"}"#).unwrap();
        assert_eq!(instruction, Instruction::Unrecognized("noop".to_string()));
        assert_eq!(instruction.tag(), "noop");
    }

    #[test]
    fn test_parse_malformed_body() {
        assert!(Instruction::parse("not json").is_err());
        assert!(Instruction::parse(r#"{"bucket_name": "b"}"#).is_err());
        assert!(Instruction::parse(r#"{"instruction": "import_file", "bucket_name": "b"}"#).is_err());
    }
}
