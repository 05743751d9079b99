use crate::props::{PropId, PropertyContainer};

/// Ordered, de-duplicated set of property names a derived value reads.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dependencies {
    names: Vec<PropId>,
}

impl Dependencies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`add`](Self::add).
    pub fn with(mut self, name: impl Into<PropId>) -> Self {
        self.add(name);
        self
    }

    pub fn add(&mut self, name: impl Into<PropId>) {
        let name = name.into();
        if !self.names.contains(&name) {
            self.names.push(name);
        }
    }

    /// Adds every name of `other`, used by composite derived properties.
    pub fn extend(&mut self, other: &Dependencies) {
        for name in &other.names {
            self.add(name);
        }
    }

    pub fn names(&self) -> &[PropId] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n.as_str() == name)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// True when any dependency changed after `generation` in `props`.
    pub fn changed_since(&self, props: &PropertyContainer, generation: u64) -> bool {
        props.changed_since(generation, self)
    }
}

impl<S: Into<PropId>> FromIterator<S> for Dependencies {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut deps = Dependencies::new();
        for name in iter {
            deps.add(name);
        }
        deps
    }
}

/// Computes a typed value from a node's properties.
///
/// `dependencies` is queried once when the derived property is created and
/// must list every name `derive` reads.
pub trait Derive: Send {
    type Output: Clone + Send + 'static;

    fn dependencies(&self) -> Dependencies;

    /// Returns `None` when required inputs are missing.
    fn derive(&mut self, props: &PropertyContainer) -> Option<Self::Output>;
}

/// Memoized [`Derive`] output.
///
/// The cache is valid as long as none of the dependencies changed identity
/// since the generation it was computed at.
pub struct DerivedProperty<D: Derive> {
    derive: D,
    dependencies: Dependencies,
    cached: Option<D::Output>,
    resolved_at: Option<u64>,
    recomputations: u64,
}

impl<D: Derive> DerivedProperty<D> {
    pub fn new(derive: D) -> Self {
        let dependencies = derive.dependencies();
        Self {
            derive,
            dependencies,
            cached: None,
            resolved_at: None,
            recomputations: 0,
        }
    }

    pub fn dependencies(&self) -> &Dependencies {
        &self.dependencies
    }

    pub fn is_dirty(&self, props: &PropertyContainer) -> bool {
        match self.resolved_at {
            None => true,
            Some(at) => self.dependencies.changed_since(props, at),
        }
    }

    /// Recomputes if dirty and returns the current value.
    pub fn resolve(&mut self, props: &PropertyContainer) -> Option<&D::Output> {
        if self.is_dirty(props) {
            self.cached = self.derive.derive(props);
            self.resolved_at = Some(props.generation());
            self.recomputations += 1;
        }
        self.cached.as_ref()
    }

    /// Last computed value without touching the inputs.
    pub fn value(&self) -> Option<&D::Output> {
        self.cached.as_ref()
    }

    pub fn recomputations(&self) -> u64 {
        self.recomputations
    }

    /// Forces the next [`resolve`](Self::resolve) to recompute.
    pub fn invalidate(&mut self) {
        self.resolved_at = None;
    }
}

impl<D: Derive> std::fmt::Debug for DerivedProperty<D>
where
    D::Output: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedProperty")
            .field("dependencies", &self.dependencies)
            .field("cached", &self.cached)
            .field("resolved_at", &self.resolved_at)
            .finish()
    }
}

/// Reads a single numeric property.
#[derive(Clone, Debug)]
pub struct NumberProp(pub PropId);

impl NumberProp {
    pub fn new(name: impl Into<PropId>) -> Self {
        Self(name.into())
    }
}

impl Derive for NumberProp {
    type Output = f64;

    fn dependencies(&self) -> Dependencies {
        Dependencies::new().with(&self.0)
    }

    fn derive(&mut self, props: &PropertyContainer) -> Option<f64> {
        props.number(self.0.as_str())
    }
}
