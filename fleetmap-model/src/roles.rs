/// The role values that identify one category of user.
///
/// Role data is inconsistent across accounts (English and Spanish spellings,
/// singular and plural), so a category is a set of accepted values rather
/// than a single tag.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct RoleSet(Vec<String>);

impl RoleSet {
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(roles.into_iter().map(Into::into).collect())
    }

    pub fn couriers() -> Self {
        Self::new(["repartidor", "repartidores"])
    }

    pub fn clients() -> Self {
        Self::new(["client", "cliente"])
    }

    pub fn providers() -> Self {
        Self::new(["provider", "proveedor"])
    }

    pub fn roles(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, role: &str) -> bool {
        self.0.iter().any(|candidate| candidate == role)
    }

    /// True if any of the record's role values belongs to this set.
    pub fn matches_any<'a, I>(&self, values: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        values.into_iter().any(|value| self.contains(value))
    }
}
