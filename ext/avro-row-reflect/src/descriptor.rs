use avro_row_core::{DataType, FieldType};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// The Rust-level type a host struct declares for one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    String,
    /// `Vec<u8>` or `[u8; N]`
    Bytes,
    /// `jiff::civil::Date`
    Date,
    /// `jiff::Timestamp`
    Timestamp,
    /// `avro_row_core::Decimal`; precision and scale come from a type override
    Decimal,
    /// A nested host struct
    Record(RecordDescriptor),
    /// `Option<T>`
    Optional(Box<HostType>),
    /// `Vec<T>`
    List(Box<HostType>),
    /// `HashMap<String, T>` or `BTreeMap<String, T>`
    Map(Box<HostType>),
    /// Anything else (host enums, newtypes); needs a type override
    Opaque,
}

impl HostType {
    pub fn optional(inner: HostType) -> Self {
        HostType::Optional(Box::new(inner))
    }

    pub fn list(element: HostType) -> Self {
        HostType::List(Box::new(element))
    }

    pub fn map(value: HostType) -> Self {
        HostType::Map(Box::new(value))
    }

    pub fn record(descriptor: RecordDescriptor) -> Self {
        HostType::Record(descriptor)
    }

    /// Whether the host type itself permits an absent value
    pub fn is_optional(&self) -> bool {
        matches!(self, HostType::Optional(_))
    }

    /// The type behind any number of `Option` layers
    pub fn without_optional(&self) -> &HostType {
        match self {
            HostType::Optional(inner) => inner.without_optional(),
            other => other,
        }
    }
}

/// Field-level annotations of one declared host field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Declared field name, as serde sees it
    pub name: String,
    pub host_type: HostType,
    /// Exposed field name in the derived schema
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename: Option<String>,
    /// Data type to use instead of the inferred one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_override: Option<DataType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable_override: Option<bool>,
    /// Excluded fields are neither written nor read
    #[serde(default)]
    pub exclude: bool,
}

impl FieldDescriptor {
    pub fn new<S: Into<String>>(name: S, host_type: HostType) -> Self {
        Self {
            name: name.into(),
            host_type,
            rename: None,
            type_override: None,
            nullable_override: None,
            exclude: false,
        }
    }

    pub fn rename<S: Into<String>>(mut self, exposed: S) -> Self {
        self.rename = Some(exposed.into());
        self
    }

    /// Force the field's data type, logical type parameters included.
    ///
    /// Only the data type of `field_type` is taken; nullability still comes
    /// from the host type or [`FieldDescriptor::nullable`].
    ///
    /// Integer host fields may carry DATE (days since the epoch) or TIMESTAMP
    /// (milliseconds since the epoch); `Date` and `Timestamp` host fields may
    /// be overridden to each other.
    pub fn type_override(mut self, field_type: FieldType) -> Self {
        self.type_override = Some(field_type.data_type);
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable_override = Some(nullable);
        self
    }

    pub fn exclude(mut self) -> Self {
        self.exclude = true;
        self
    }

    /// Name of the field in the derived schema
    pub fn exposed_name(&self) -> &str {
        self.rename.as_deref().unwrap_or(&self.name)
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable_override
            .unwrap_or_else(|| self.host_type.is_optional())
    }
}

/// The declarative field table of a host struct
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDescriptor {
    /// Native record name, optionally dotted with a namespace
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
}

impl RecordDescriptor {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Declared fields that take part in the derived schema, in declared order
    pub fn included(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| !f.exclude)
    }

    /// Find the included field exposed under `name`
    pub fn by_exposed_name(&self, name: &str) -> Option<&FieldDescriptor> {
        self.included().find(|f| f.exposed_name() == name)
    }
}

/// A host struct that can describe its own fields.
///
/// The struct's serde representation must be a map keyed by the declared
/// field names; excluded fields need a serde default to be readable.
///
/// ```ignore
/// impl Reflect for Order {
///     fn descriptor() -> RecordDescriptor {
///         RecordDescriptor::new("Order")
///             .field(FieldDescriptor::new("id", HostType::I64))
///             .field(
///                 FieldDescriptor::new("total", HostType::Decimal)
///                     .type_override(FieldType::decimal(10, 2)),
///             )
///     }
/// }
/// ```
pub trait Reflect: Serialize + DeserializeOwned {
    fn descriptor() -> RecordDescriptor;
}
