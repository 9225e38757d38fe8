//! Service and type identities.
//!
//! Identities are structural: two references to the same type name with the
//! same arguments are the same service. Open-generic definitions are distinct
//! from every one of their closed instantiations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A reference to a type as the front end normalized it.
///
/// # Examples
///
/// ```rust
/// use ferrous_di_analyzer::TypeRef;
///
/// let repo = TypeRef::generic("IRepository", vec![TypeRef::closed("User")]);
/// assert_eq!(repo.to_string(), "IRepository<User>");
/// assert_eq!(repo.open_definition(), Some(TypeRef::open("IRepository", 1)));
/// assert_eq!(TypeRef::open("IDictionary", 2).to_string(), "IDictionary<,>");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeRef {
    /// Concrete type, possibly with type arguments (which may themselves be parameters)
    Closed {
        name: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<TypeRef>,
    },
    /// Open-generic type definition such as `Repository<>`
    Open { name: String, arity: usize },
    /// Unbound generic type parameter such as `T`
    Param { name: String },
}

impl TypeRef {
    /// Non-generic closed type.
    pub fn closed(name: impl Into<String>) -> Self {
        TypeRef::Closed { name: name.into(), args: Vec::new() }
    }

    /// Closed generic instantiation.
    pub fn generic(name: impl Into<String>, args: Vec<TypeRef>) -> Self {
        TypeRef::Closed { name: name.into(), args }
    }

    /// Open-generic definition.
    pub fn open(name: impl Into<String>, arity: usize) -> Self {
        TypeRef::Open { name: name.into(), arity }
    }

    /// Generic type parameter.
    pub fn param(name: impl Into<String>) -> Self {
        TypeRef::Param { name: name.into() }
    }

    /// Fully qualified name without type arguments.
    pub fn name(&self) -> &str {
        match self {
            TypeRef::Closed { name, .. }
            | TypeRef::Open { name, .. }
            | TypeRef::Param { name } => name,
        }
    }

    /// Last segment of the name, ignoring namespaces and module paths.
    pub fn simple_name(&self) -> &str {
        let name = self.name();
        let tail = name.rsplit("::").next().unwrap_or(name);
        tail.rsplit('.').next().unwrap_or(tail)
    }

    /// Returns true for open-generic definitions.
    pub fn is_open(&self) -> bool {
        matches!(self, TypeRef::Open { .. })
    }

    /// Returns true if `inner` appears somewhere among this reference's type arguments.
    ///
    /// `Wrap<List<User>>` nests both `List<User>` and `User`, but not itself.
    pub fn nests(&self, inner: &TypeRef) -> bool {
        self.args().iter().any(|arg| arg == inner || arg.nests(inner))
    }

    /// Type arguments of a closed instantiation.
    pub fn args(&self) -> &[TypeRef] {
        match self {
            TypeRef::Closed { args, .. } => args,
            _ => &[],
        }
    }

    /// The open-generic definition a closed generic instantiates.
    ///
    /// Returns `None` for non-generic types, open definitions and parameters.
    pub fn open_definition(&self) -> Option<TypeRef> {
        match self {
            TypeRef::Closed { name, args } if !args.is_empty() => {
                Some(TypeRef::open(name.clone(), args.len()))
            }
            _ => None,
        }
    }

    /// Closes an open definition over the given parameter names.
    ///
    /// `IRepository<>` closed over `["T"]` is `IRepository<T>`. Returns `None`
    /// when the arity differs from the number of parameters.
    pub fn close_over(&self, params: &[String]) -> Option<TypeRef> {
        match self {
            TypeRef::Open { name, arity } if *arity == params.len() => Some(TypeRef::generic(
                name.clone(),
                params.iter().map(|p| TypeRef::param(p.clone())).collect(),
            )),
            TypeRef::Open { .. } => None,
            other => Some(other.clone()),
        }
    }

    /// Replaces each parameter named in `params` with the matching entry of `args`.
    ///
    /// Parameters not listed are left in place.
    pub fn substitute(&self, params: &[String], args: &[TypeRef]) -> TypeRef {
        match self {
            TypeRef::Param { name } => params
                .iter()
                .position(|p| p == name)
                .and_then(|idx| args.get(idx))
                .cloned()
                .unwrap_or_else(|| self.clone()),
            TypeRef::Closed { name, args: inner } => TypeRef::Closed {
                name: name.clone(),
                args: inner.iter().map(|a| a.substitute(params, args)).collect(),
            },
            TypeRef::Open { .. } => self.clone(),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Closed { name, args } => {
                f.write_str(name)?;
                if !args.is_empty() {
                    f.write_str("<")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{}", arg)?;
                    }
                    f.write_str(">")?;
                }
                Ok(())
            }
            TypeRef::Open { name, arity } => {
                write!(f, "{}<{}>", name, ",".repeat(arity.saturating_sub(1)))
            }
            TypeRef::Param { name } => f.write_str(name),
        }
    }
}

/// Identity of a registered service: a type plus an optional service key.
///
/// Keyed registrations never conflict with unkeyed ones or with other keys.
///
/// # Examples
///
/// ```rust
/// use ferrous_di_analyzer::{ServiceIdentity, TypeRef};
///
/// let plain = ServiceIdentity::of(TypeRef::closed("ICache"));
/// let keyed = ServiceIdentity::keyed(TypeRef::closed("ICache"), "redis");
/// assert_ne!(plain, keyed);
/// assert_eq!(keyed.to_string(), "ICache [key: redis]");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServiceIdentity {
    pub ty: TypeRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl ServiceIdentity {
    /// Unkeyed identity.
    pub fn of(ty: TypeRef) -> Self {
        Self { ty, key: None }
    }

    /// Keyed identity.
    pub fn keyed(ty: TypeRef, key: impl Into<String>) -> Self {
        Self { ty, key: Some(key.into()) }
    }

    /// Same key, different type.
    pub fn with_ty(&self, ty: TypeRef) -> Self {
        Self { ty, key: self.key.clone() }
    }

    /// Returns true if the service type is an open-generic definition.
    pub fn is_open_generic(&self) -> bool {
        self.ty.is_open()
    }
}

impl From<TypeRef> for ServiceIdentity {
    fn from(ty: TypeRef) -> Self {
        ServiceIdentity::of(ty)
    }
}

impl fmt::Display for ServiceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{} [key: {}]", self.ty, key),
            None => write!(f, "{}", self.ty),
        }
    }
}
