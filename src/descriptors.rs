//! Type descriptors: what an implementation type offers and what it needs.

use serde::{Deserialize, Serialize};

use crate::identity::{ServiceIdentity, TypeRef};

/// One constructor (or factory) dependency.
///
/// # Examples
///
/// ```rust
/// use ferrous_di_analyzer::{ParameterDependency, TypeRef};
///
/// let handlers = ParameterDependency::enumerable(TypeRef::closed("IHandler"));
/// assert!(handlers.is_enumerable);
///
/// let clock = ParameterDependency::optional(TypeRef::closed("IClock"));
/// assert!(clock.has_default_or_optional);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParameterDependency {
    /// The service requested; for enumerable parameters, the element service
    pub required: ServiceIdentity,
    /// Parameter is `IEnumerable<T>`-shaped
    #[serde(default)]
    pub is_enumerable: bool,
    /// Parameter has a default value or is marked optional
    #[serde(default)]
    pub has_default_or_optional: bool,
}

impl ParameterDependency {
    pub fn required(ty: TypeRef) -> Self {
        Self {
            required: ServiceIdentity::of(ty),
            is_enumerable: false,
            has_default_or_optional: false,
        }
    }

    pub fn keyed(ty: TypeRef, key: impl Into<String>) -> Self {
        Self {
            required: ServiceIdentity::keyed(ty, key),
            is_enumerable: false,
            has_default_or_optional: false,
        }
    }

    pub fn enumerable(element: TypeRef) -> Self {
        Self {
            is_enumerable: true,
            ..Self::required(element)
        }
    }

    pub fn optional(ty: TypeRef) -> Self {
        Self {
            has_default_or_optional: true,
            ..Self::required(ty)
        }
    }

    /// Same parameter with generic parameters replaced.
    pub fn substitute(&self, params: &[String], args: &[TypeRef]) -> Self {
        Self {
            required: self.required.with_ty(self.required.ty.substitute(params, args)),
            ..self.clone()
        }
    }
}

/// Shape of an implementation type.
///
/// For open-generic implementations `identity` is the open definition and
/// `type_params` names its parameters; capabilities and dependencies may then
/// refer to those parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeShape {
    pub identity: TypeRef,
    #[serde(default)]
    pub type_params: Vec<String>,
    /// Implemented interfaces and base types, closed over generic substitution
    #[serde(default)]
    pub capabilities: Vec<TypeRef>,
    #[serde(default)]
    pub constructor_dependencies: Vec<ParameterDependency>,
    #[serde(default)]
    pub is_disposable: bool,
    #[serde(default)]
    pub is_async_disposable: bool,
}

impl TypeShape {
    pub fn new(identity: TypeRef) -> Self {
        Self {
            identity,
            type_params: Vec::new(),
            capabilities: Vec::new(),
            constructor_dependencies: Vec::new(),
            is_disposable: false,
            is_async_disposable: false,
        }
    }

    /// Open-generic shape with the given parameter names.
    pub fn open(name: impl Into<String>, type_params: &[&str]) -> Self {
        let mut shape = Self::new(TypeRef::open(name, type_params.len()));
        shape.type_params = type_params.iter().map(|p| p.to_string()).collect();
        shape
    }

    #[must_use]
    pub fn implements(mut self, capability: TypeRef) -> Self {
        self.capabilities.push(capability);
        self
    }

    #[must_use]
    pub fn depends_on(mut self, dependency: ParameterDependency) -> Self {
        self.constructor_dependencies.push(dependency);
        self
    }

    #[must_use]
    pub fn disposable(mut self) -> Self {
        self.is_disposable = true;
        self
    }

    #[must_use]
    pub fn async_disposable(mut self) -> Self {
        self.is_async_disposable = true;
        self
    }

    /// Returns true if `service` is this type itself or one of its capabilities.
    pub fn offers(&self, service: &TypeRef) -> bool {
        if let Some(own) = self.identity.close_over(&self.type_params) {
            if &own == service {
                return true;
            }
        }
        self.capabilities.iter().any(|cap| cap == service)
    }

    /// Constructor dependencies with this shape's parameters replaced by `args`.
    ///
    /// With no `args` the dependencies are returned as declared.
    pub fn dependencies_closed_over(&self, args: &[TypeRef]) -> Vec<ParameterDependency> {
        if args.is_empty() || self.type_params.is_empty() {
            return self.constructor_dependencies.clone();
        }
        self.constructor_dependencies
            .iter()
            .map(|dep| dep.substitute(&self.type_params, args))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_shape_offers_its_closed_over_capability() {
        let shape = TypeShape::open("Repository", &["T"])
            .implements(TypeRef::generic("IRepository", vec![TypeRef::param("T")]));

        assert!(shape.offers(&TypeRef::generic("IRepository", vec![TypeRef::param("T")])));
        assert!(shape.offers(&TypeRef::generic("Repository", vec![TypeRef::param("T")])));
        assert!(!shape.offers(&TypeRef::generic("IReadOnlyRepository", vec![TypeRef::param("T")])));
    }

    #[test]
    fn dependencies_are_substituted() {
        let shape = TypeShape::open("Repository", &["T"])
            .depends_on(ParameterDependency::required(TypeRef::generic(
                "ILogger",
                vec![TypeRef::param("T")],
            )))
            .depends_on(ParameterDependency::required(TypeRef::closed("DbContext")));

        let closed = shape.dependencies_closed_over(&[TypeRef::closed("User")]);
        assert_eq!(closed[0].required.ty.to_string(), "ILogger<User>");
        assert_eq!(closed[1].required.ty.to_string(), "DbContext");
    }
}
