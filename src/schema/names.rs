use std::borrow::Cow;
use std::fmt::{Debug, Display, Write};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A schema item name. Cloning is inexpensive.
#[derive(Hash, PartialEq, Eq, Deserialize, Serialize, Debug, Clone, Ord, PartialOrd)]
#[serde(transparent)]
pub struct Name(Arc<Cow<'static, str>>);

impl Name {
    /// Creates a new name.
    pub fn new<T: Into<Self>>(contents: T) -> Self {
        contents.into()
    }
}

impl From<Cow<'static, str>> for Name {
    fn from(value: Cow<'static, str>) -> Self {
        Self(Arc::new(value))
    }
}

impl From<&'static str> for Name {
    fn from(value: &'static str) -> Self {
        Self::from(Cow::Borrowed(value))
    }
}

impl From<String> for Name {
    fn from(value: String) -> Self {
        Self::from(Cow::Owned(value))
    }
}

impl Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl AsRef<str> for Name {
    fn as_ref(&self) -> &str {
        self.0.as_ref()
    }
}

/// The project domain a schema item belongs to. This value is used for
/// namespacing, keeping one project's collections distinct from another's.
#[derive(Hash, PartialEq, Eq, Deserialize, Serialize, Debug, Clone, Ord, PartialOrd)]
#[serde(transparent)]
pub struct Domain(Name);

impl From<Cow<'static, str>> for Domain {
    fn from(value: Cow<'static, str>) -> Self {
        Self(Name::from(value))
    }
}

impl From<&'static str> for Domain {
    fn from(value: &'static str) -> Self {
        Self(Name::from(value))
    }
}

impl From<String> for Domain {
    fn from(value: String) -> Self {
        Self(Name::from(value))
    }
}

impl From<Name> for Domain {
    fn from(value: Name) -> Self {
        Self(value)
    }
}

impl Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl AsRef<str> for Domain {
    fn as_ref(&self) -> &str {
        self.0.as_ref()
    }
}

/// The namespaced name of a [`Schema`](super::Schema).
#[derive(Hash, PartialEq, Eq, Deserialize, Serialize, Debug, Clone, Ord, PartialOrd)]
pub struct SchemaName {
    /// The domain that defines this schema.
    pub domain: Domain,

    /// The name, unique within `domain`.
    pub name: Name,
}

impl SchemaName {
    /// Creates a new schema name.
    pub fn new<D: Into<Domain>, N: Into<Name>>(domain: D, name: N) -> Self {
        Self {
            domain: domain.into(),
            name: name.into(),
        }
    }
}

impl Display for SchemaName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.domain, f)?;
        f.write_char('.')?;
        Display::fmt(&self.name, f)
    }
}

/// The namespaced name of a [`Collection`](super::Collection).
#[derive(Hash, PartialEq, Eq, Deserialize, Serialize, Debug, Clone, Ord, PartialOrd)]
pub struct CollectionName {
    /// The domain that defines this collection.
    pub domain: Domain,

    /// The name, unique within `domain`.
    pub name: Name,
}

impl CollectionName {
    /// Creates a new collection name.
    pub fn new<D: Into<Domain>, N: Into<Name>>(domain: D, name: N) -> Self {
        Self {
            domain: domain.into(),
            name: name.into(),
        }
    }
}

impl Display for CollectionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.domain, f)?;
        f.write_char('.')?;
        Display::fmt(&self.name, f)
    }
}

/// The name of a [`View`](super::View).
#[derive(Hash, PartialEq, Eq, Deserialize, Serialize, Debug, Clone)]
pub struct ViewName {
    /// The name of the collection that contains this view.
    pub collection: CollectionName,
    /// The name of this view.
    pub name: Name,
}

impl ViewName {
    /// Creates a new view name.
    pub fn new<C: Into<CollectionName>, N: Into<Name>>(collection: C, name: N) -> Self {
        Self {
            collection: collection.into(),
            name: name.into(),
        }
    }
}

impl Display for ViewName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.collection, f)?;
        f.write_char('.')?;
        Display::fmt(&self.name, f)
    }
}

#[test]
fn name_display_tests() {
    assert_eq!(Name::new("forms").to_string(), "forms");
    assert_eq!(
        CollectionName::new("hsph", "forms").to_string(),
        "hsph.forms"
    );
    let view = ViewName {
        collection: CollectionName::new("hsph", "forms"),
        name: Name::new("facilities"),
    };
    assert_eq!(view.to_string(), "hsph.forms.facilities");
}

#[test]
fn name_equality_is_by_contents() {
    assert_eq!(Name::new(String::from("sites")), Name::new("sites"));
    assert_eq!(
        CollectionName::new("hsph", "sites"),
        CollectionName::new("hsph", String::from("sites"))
    );
}
