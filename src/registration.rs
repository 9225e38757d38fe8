//! Registration facts.

use serde::{Deserialize, Serialize};

use crate::descriptors::ParameterDependency;
use crate::diagnostics::SourceLocation;
use crate::identity::{ServiceIdentity, TypeRef};
use crate::lifetime::Lifetime;

/// How an implementation type was named at the registration site.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeForm {
    /// `AddScoped<IFoo, Foo>()`: the compiler already checked compatibility
    #[default]
    GenericArguments,
    /// `AddScoped(typeof(IFoo), typeof(Foo))`: only checked at activation
    RuntimeTypes,
}

/// What the container builds when the service is requested.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Implementation {
    /// Constructed by the container from the type's constructor
    Type {
        ty: TypeRef,
        #[serde(default)]
        form: TypeForm,
    },
    /// Built by a factory delegate.
    ///
    /// `calls` lists the services the factory body resolves when the front end
    /// could inspect it; `None` marks an opaque factory.
    Factory {
        #[serde(default)]
        calls: Option<Vec<ParameterDependency>>,
    },
    /// A pre-built instance handed to the container
    Instance {
        #[serde(default)]
        ty: Option<TypeRef>,
    },
}

impl Implementation {
    /// Type named through generic arguments.
    pub fn of(ty: TypeRef) -> Self {
        Implementation::Type { ty, form: TypeForm::GenericArguments }
    }

    /// Type named through runtime type objects.
    pub fn runtime(ty: TypeRef) -> Self {
        Implementation::Type { ty, form: TypeForm::RuntimeTypes }
    }

    /// Factory whose resolved services are known.
    pub fn factory(calls: Vec<ParameterDependency>) -> Self {
        Implementation::Factory { calls: Some(calls) }
    }

    /// Factory whose body could not be inspected.
    pub fn opaque_factory() -> Self {
        Implementation::Factory { calls: None }
    }

    pub fn instance(ty: Option<TypeRef>) -> Self {
        Implementation::Instance { ty }
    }

    /// Implementation type, when one is named.
    pub fn type_ref(&self) -> Option<&TypeRef> {
        match self {
            Implementation::Type { ty, .. } => Some(ty),
            Implementation::Instance { ty } => ty.as_ref(),
            Implementation::Factory { .. } => None,
        }
    }

    pub fn is_factory(&self) -> bool {
        matches!(self, Implementation::Factory { .. })
    }

    /// Short human-readable description for exports and messages.
    pub fn describe(&self) -> String {
        match self {
            Implementation::Type { ty, .. } => ty.to_string(),
            Implementation::Factory { calls: Some(_) } => "factory".to_string(),
            Implementation::Factory { calls: None } => "factory (opaque)".to_string(),
            Implementation::Instance { ty: Some(ty) } => format!("instance of {}", ty),
            Implementation::Instance { ty: None } => "instance".to_string(),
        }
    }
}

/// One service registration as declared in the composition root.
///
/// `insertion_index` is the declaration order and is authoritative for
/// override and `TryAdd` precedence; the order facts arrive in is not.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Registration {
    pub service: ServiceIdentity,
    pub implementation: Implementation,
    pub lifetime: Lifetime,
    pub location: SourceLocation,
    pub insertion_index: usize,
    /// Registered through a `TryAdd*` call
    #[serde(default)]
    pub is_conditional: bool,
}

impl Registration {
    pub fn new(
        service: ServiceIdentity,
        implementation: Implementation,
        lifetime: Lifetime,
        location: SourceLocation,
        insertion_index: usize,
    ) -> Self {
        Self {
            service,
            implementation,
            lifetime,
            location,
            insertion_index,
            is_conditional: false,
        }
    }

    #[must_use]
    pub fn conditional(mut self) -> Self {
        self.is_conditional = true;
        self
    }

    /// Registration call name as it would appear in source, for messages.
    pub fn call_name(&self) -> String {
        let lifetime = match self.lifetime {
            Lifetime::Singleton => "Singleton",
            Lifetime::Scoped => "Scoped",
            Lifetime::Transient => "Transient",
        };
        let prefix = if self.is_conditional { "TryAdd" } else { "Add" };
        format!("{}{}", prefix, lifetime)
    }
}
