use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A typed piece of content held by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// A byte buffer
    Bytes(Vec<u8>),
    /// A boolean
    Boolean(bool),
    /// A UTF-8 string
    String(String),
    /// A 128-bit unsigned integer
    UnsignedInt(u128),
    /// A 128-bit signed integer
    SignedInt(i128),
    /// A floating point number
    Float(f64),
    /// An ordered list of values
    List(Vec<Value>),
    /// A keyed record of values
    Record(BTreeMap<String, Value>),
}

impl Value {
    /// Get the [`ValueKind`] that corresponds to this variant of [`Value`]
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bytes(_) => ValueKind::Bytes,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::String(_) => ValueKind::String,
            Value::UnsignedInt(_) => ValueKind::UnsignedInt,
            Value::SignedInt(_) => ValueKind::SignedInt,
            Value::Float(_) => ValueKind::Float,
            Value::List(_) => ValueKind::List,
            Value::Record(_) => ValueKind::Record,
        }
    }
}

/// The kind tag of a [`Value`], retained by empty placeholders so that the
/// shape of withheld content stays traceable
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueKind {
    /// A byte buffer
    #[default]
    Bytes,
    /// A boolean
    Boolean,
    /// A UTF-8 string
    String,
    /// A 128-bit unsigned integer
    UnsignedInt,
    /// A 128-bit signed integer
    SignedInt,
    /// A floating point number
    Float,
    /// An ordered list of values
    List,
    /// A keyed record of values
    Record,
}

/// The content carried by one representation of a stored object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    /// Concrete content
    Data(Value),
    /// An error produced by a computation, captured as data. Failures carry
    /// no private content by convention, so they are visible to any caller.
    Failure(String),
    /// No content; only the kind of the absent data is retained
    Empty(ValueKind),
}

impl Payload {
    /// The kind of the content, when one applies
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Payload::Data(value) => Some(value.kind()),
            Payload::Failure(_) => None,
            Payload::Empty(kind) => Some(*kind),
        }
    }

    /// True when this payload is an empty placeholder
    pub fn is_empty(&self) -> bool {
        matches!(self, Payload::Empty(_))
    }

    /// An empty placeholder preserving the kind of this payload
    pub fn as_empty(&self) -> Payload {
        Payload::Empty(self.kind().unwrap_or_default())
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Data(value)
    }
}

/// A value held by the store: either a single representation, or a twin
/// pairing a private representation with a shareable mock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoredObject {
    /// A single-representation value
    Plain {
        /// The content
        payload: Payload,
        /// True when the content is itself a mock, safe to show to anyone
        mock: bool,
    },
    /// A dual-representation value
    Twin {
        /// The sensitive half; never returned to a caller lacking read access
        private: Payload,
        /// The stand-in half; must never contain sensitive content
        mock: Payload,
    },
}

impl StoredObject {
    /// A plain object over the given payload
    pub fn plain(payload: impl Into<Payload>) -> Self {
        StoredObject::Plain {
            payload: payload.into(),
            mock: false,
        }
    }

    /// A plain object whose payload is itself a mock
    pub fn mock(payload: impl Into<Payload>) -> Self {
        StoredObject::Plain {
            payload: payload.into(),
            mock: true,
        }
    }

    /// A twin object over the given private and mock payloads
    pub fn twin(private: impl Into<Payload>, mock: impl Into<Payload>) -> Self {
        StoredObject::Twin {
            private: private.into(),
            mock: mock.into(),
        }
    }

    /// True when this object carries a dual representation
    pub fn is_twin(&self) -> bool {
        matches!(self, StoredObject::Twin { .. })
    }

    /// The sensitive representation of this object
    pub fn private_payload(&self) -> &Payload {
        match self {
            StoredObject::Plain { payload, .. } => payload,
            StoredObject::Twin { private, .. } => private,
        }
    }

    /// The kind of this object's sensitive representation
    pub fn kind(&self) -> Option<ValueKind> {
        self.private_payload().kind()
    }

    /// An empty placeholder preserving the kind of this object's content
    pub fn as_empty(&self) -> Payload {
        self.private_payload().as_empty()
    }
}
