//! Fact recording for composition roots.
//!
//! [`ServiceCollection`] mirrors the registration calls of a composition root
//! and records them as facts, assigning declaration order and source
//! locations as it goes. Front ends that already produce [`FactSet`]s do not
//! need it; it exists for embedding and for tests.

use crate::descriptors::{ParameterDependency, TypeShape};
use crate::diagnostics::SourceLocation;
use crate::facts::FactSet;
use crate::identity::{ServiceIdentity, TypeRef};
use crate::lifetime::Lifetime;
use crate::registration::{Implementation, Registration};
use crate::scope::{ProcedureTrace, StaticAssignment};

/// Records registrations, type shapes and traces into a [`FactSet`].
///
/// Each registration gets the next insertion index and a location in the
/// collection's file whose line is the insertion index plus one.
///
/// # Examples
///
/// ```rust
/// use ferrous_di_analyzer::{ServiceCollection, TypeRef, Lifetime};
///
/// let mut services = ServiceCollection::new();
/// services
///     .add_singleton(TypeRef::closed("IClock"), TypeRef::closed("SystemClock"))
///     .try_add_scoped(TypeRef::closed("IClock"), TypeRef::closed("FakeClock"));
///
/// let facts = services.build();
/// assert_eq!(facts.registrations.len(), 2);
/// assert_eq!(facts.registrations[1].insertion_index, 1);
/// assert!(facts.registrations[1].is_conditional);
/// assert_eq!(facts.registrations[0].lifetime, Lifetime::Singleton);
/// ```
#[derive(Debug, Clone)]
pub struct ServiceCollection {
    file: String,
    facts: FactSet,
}

impl ServiceCollection {
    /// Creates an empty collection whose registrations are located in `Program.cs`.
    pub fn new() -> Self {
        Self::in_file("Program.cs")
    }

    /// Creates an empty collection whose registrations are located in `file`.
    pub fn in_file(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            facts: FactSet::new(),
        }
    }

    fn next_location(&self) -> (usize, SourceLocation) {
        let index = self.facts.registrations.len();
        (index, SourceLocation::new(self.file.clone(), index as u32 + 1, 1))
    }

    /// Records a registration with an explicit implementation.
    pub fn add(
        &mut self,
        lifetime: Lifetime,
        service: impl Into<ServiceIdentity>,
        implementation: Implementation,
    ) -> &mut Self {
        let (index, location) = self.next_location();
        self.facts.registrations.push(Registration::new(
            service.into(),
            implementation,
            lifetime,
            location,
            index,
        ));
        self
    }

    /// Records a `TryAdd*` registration with an explicit implementation.
    pub fn try_add(
        &mut self,
        lifetime: Lifetime,
        service: impl Into<ServiceIdentity>,
        implementation: Implementation,
    ) -> &mut Self {
        let (index, location) = self.next_location();
        let registration =
            Registration::new(service.into(), implementation, lifetime, location, index);
        self.facts.registrations.push(registration.conditional());
        self
    }

    /// Records a type-to-type registration.
    ///
    /// Open-generic pairs can only be written with runtime type objects, so
    /// they are recorded in that form; closed pairs use generic arguments.
    pub fn add_type(
        &mut self,
        lifetime: Lifetime,
        service: TypeRef,
        implementation: TypeRef,
    ) -> &mut Self {
        let implementation = if service.is_open() || implementation.is_open() {
            Implementation::runtime(implementation)
        } else {
            Implementation::of(implementation)
        };
        self.add(lifetime, service, implementation)
    }

    pub fn add_singleton(&mut self, service: TypeRef, implementation: TypeRef) -> &mut Self {
        self.add_type(Lifetime::Singleton, service, implementation)
    }

    pub fn add_scoped(&mut self, service: TypeRef, implementation: TypeRef) -> &mut Self {
        self.add_type(Lifetime::Scoped, service, implementation)
    }

    pub fn add_transient(&mut self, service: TypeRef, implementation: TypeRef) -> &mut Self {
        self.add_type(Lifetime::Transient, service, implementation)
    }

    pub fn try_add_singleton(&mut self, service: TypeRef, implementation: TypeRef) -> &mut Self {
        self.try_add(Lifetime::Singleton, service, Implementation::of(implementation))
    }

    pub fn try_add_scoped(&mut self, service: TypeRef, implementation: TypeRef) -> &mut Self {
        self.try_add(Lifetime::Scoped, service, Implementation::of(implementation))
    }

    pub fn try_add_transient(&mut self, service: TypeRef, implementation: TypeRef) -> &mut Self {
        self.try_add(Lifetime::Transient, service, Implementation::of(implementation))
    }

    /// Records a keyed type-to-type registration.
    pub fn add_keyed(
        &mut self,
        lifetime: Lifetime,
        service: TypeRef,
        key: impl Into<String>,
        implementation: TypeRef,
    ) -> &mut Self {
        self.add(lifetime, ServiceIdentity::keyed(service, key), Implementation::of(implementation))
    }

    /// Records a factory registration whose resolved services are known.
    pub fn add_factory(
        &mut self,
        lifetime: Lifetime,
        service: TypeRef,
        calls: Vec<ParameterDependency>,
    ) -> &mut Self {
        self.add(lifetime, service, Implementation::factory(calls))
    }

    /// Records a factory registration whose body could not be inspected.
    pub fn add_opaque_factory(&mut self, lifetime: Lifetime, service: TypeRef) -> &mut Self {
        self.add(lifetime, service, Implementation::opaque_factory())
    }

    /// Records a pre-built singleton instance.
    pub fn add_instance(&mut self, service: TypeRef, instance_type: Option<TypeRef>) -> &mut Self {
        self.add(Lifetime::Singleton, service, Implementation::instance(instance_type))
    }

    /// Records the shape of an implementation type.
    pub fn add_shape(&mut self, shape: TypeShape) -> &mut Self {
        self.facts.type_shapes.push(shape);
        self
    }

    pub fn add_procedure(&mut self, trace: ProcedureTrace) -> &mut Self {
        self.facts.procedures.push(trace);
        self
    }

    pub fn add_static_assignment(&mut self, assignment: StaticAssignment) -> &mut Self {
        self.facts.static_assignments.push(assignment);
        self
    }

    pub fn len(&self) -> usize {
        self.facts.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.registrations.is_empty()
    }

    /// Finishes recording.
    pub fn build(self) -> FactSet {
        self.facts
    }
}

impl Default for ServiceCollection {
    fn default() -> Self {
        Self::new()
    }
}
