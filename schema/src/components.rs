use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::num::{NonZeroU32, NonZeroUsize};

use crate::{Constant, EnumType, ProgramId, ServiceType, StructType, TypedefType};

/// Trait implemented by all named schema entities stored in a component table.
pub trait Component {
    const DISPLAY_NAME: &'static str;

    fn name(&self) -> &str;

    fn program(&self) -> ProgramId;
}

/// Type on which internal component traits are implemented.
///
/// Keeps the container accessors out of the public [`Component`] trait.
pub struct ComponentTraits;

/// A component referencable via [`Ref`]. Intended for internal use.
pub trait HasArenaContainer<R: Component>: Sized {
    fn get_container_from_construction_table(table: &ConstructionComponentTable) -> &[Option<R>];
    fn get_container_from_construction_table_mut(
        table: &mut ConstructionComponentTable,
    ) -> &mut Vec<Option<R>>;
    fn get_container_from_schema_table(table: &SchemaComponentTable) -> &[R];
}

/// A handle to a [`Component`] stored in a [`ComponentTable`].
///
/// Entities refer to each other (and to themselves) only through these handles, so
/// recursive types never embed one another directly.
pub struct Ref<R>(NonZeroU32, PhantomData<R>)
where
    R: Component,
    ComponentTraits: HasArenaContainer<R>;

impl<R> Ref<R>
where
    R: Component,
    ComponentTraits: HasArenaContainer<R>,
{
    const fn from_inner(inner: NonZeroU32) -> Self {
        Self(inner, PhantomData)
    }

    fn index(self) -> usize {
        let size: NonZeroUsize = self
            .0
            .try_into()
            .expect("Could not convert component reference to usize index");
        usize::from(size) - 1
    }

    pub fn get(self, table: &impl ComponentTable) -> &R {
        table.get(self)
    }
}

// derive(...) does not work if R itself does not derive the trait, even though it is only "used"
// in the PhantomData; hence the manual implementations.

impl<R> Copy for Ref<R>
where
    R: Component,
    ComponentTraits: HasArenaContainer<R>,
{
}

impl<R> Clone for Ref<R>
where
    R: Component,
    ComponentTraits: HasArenaContainer<R>,
{
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> fmt::Debug for Ref<R>
where
    R: Component,
    ComponentTraits: HasArenaContainer<R>,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<{} #{}>", R::DISPLAY_NAME, self.0)
    }
}

impl<R> PartialEq for Ref<R>
where
    R: Component,
    ComponentTraits: HasArenaContainer<R>,
{
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<R> Eq for Ref<R>
where
    R: Component,
    ComponentTraits: HasArenaContainer<R>,
{
}

impl<R> Hash for Ref<R>
where
    R: Component,
    ComponentTraits: HasArenaContainer<R>,
{
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl<R> PartialOrd for Ref<R>
where
    R: Component,
    ComponentTraits: HasArenaContainer<R>,
{
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<R> Ord for Ref<R>
where
    R: Component,
    ComponentTraits: HasArenaContainer<R>,
{
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

/// An arena-like container for the schema's [`Component`]s.
pub trait ComponentTable {
    /// Retrieves a component by reference.
    /// Panics if the component is not present in the table.
    fn get<R>(&self, ref_: Ref<R>) -> &R
    where
        R: Component,
        ComponentTraits: HasArenaContainer<R>;
}

/// The [component table](ComponentTable) used while linking.
///
/// Slots are `Option`s: the linker reserves a [`Ref`] for every declaration before any of them
/// is resolved, so that forward and self references can be handed out early.
#[derive(Default)]
pub struct ConstructionComponentTable {
    enums: Vec<Option<EnumType>>,
    structs: Vec<Option<StructType>>,
    typedefs: Vec<Option<TypedefType>>,
    services: Vec<Option<ServiceType>>,
    constants: Vec<Option<Constant>>,
}

impl ComponentTable for ConstructionComponentTable {
    fn get<R>(&self, ref_: Ref<R>) -> &R
    where
        R: Component,
        ComponentTraits: HasArenaContainer<R>,
    {
        self.try_get(ref_).expect("Component is not present")
    }
}

impl ConstructionComponentTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Creates a [`Ref`] which points to an absent, reserved slot in the table.
    pub(crate) fn reserve<R>(&mut self) -> Ref<R>
    where
        R: Component,
        ComponentTraits: HasArenaContainer<R>,
    {
        let container = ComponentTraits::get_container_from_construction_table_mut(self);
        container.push(None);

        // The size is non-zero after the push
        let size = NonZeroUsize::new(container.len()).expect("container is not empty");
        let id: NonZeroU32 = size.try_into().expect("ID did not fit into 32-bit integer");

        Ref::from_inner(id)
    }

    /// Fills the slot pointed to by `ref_`. Returns `ref_` for convenience.
    pub(crate) fn insert<R>(&mut self, ref_: Ref<R>, value: R) -> Ref<R>
    where
        R: Component,
        ComponentTraits: HasArenaContainer<R>,
    {
        let container = ComponentTraits::get_container_from_construction_table_mut(self);
        let slot = container
            .get_mut(ref_.index())
            .expect("Invalid component reference (out-of-bounds)");
        *slot = Some(value);
        ref_
    }

    /// Returns the component if its slot has been filled already.
    pub(crate) fn try_get<R>(&self, ref_: Ref<R>) -> Option<&R>
    where
        R: Component,
        ComponentTraits: HasArenaContainer<R>,
    {
        ComponentTraits::get_container_from_construction_table(self)
            .get(ref_.index())
            .expect("Invalid component reference (out-of-bounds)")
            .as_ref()
    }

    pub(crate) fn get_mut<R>(&mut self, ref_: Ref<R>) -> Option<&mut R>
    where
        R: Component,
        ComponentTraits: HasArenaContainer<R>,
    {
        ComponentTraits::get_container_from_construction_table_mut(self)
            .get_mut(ref_.index())
            .and_then(Option::as_mut)
    }

    /// Converts this table into a read-only [`SchemaComponentTable`].
    /// Returns `None` if any reserved slot was never filled.
    pub(crate) fn convert_to_schema_table(self) -> Option<SchemaComponentTable> {
        Some(SchemaComponentTable {
            enums: Self::convert_container(self.enums)?,
            structs: Self::convert_container(self.structs)?,
            typedefs: Self::convert_container(self.typedefs)?,
            services: Self::convert_container(self.services)?,
            constants: Self::convert_container(self.constants)?,
        })
    }

    fn convert_container<R>(container: Vec<Option<R>>) -> Option<Box<[R]>> {
        container.into_iter().collect::<Option<Vec<R>>>().map(Vec::into_boxed_slice)
    }
}

/// The [component table](ComponentTable) that backs a finished [`Schema`](crate::Schema).
///
/// Every [`Ref`] handed out by the loader points at a present component in this table.
#[derive(Debug, PartialEq)]
pub struct SchemaComponentTable {
    enums: Box<[EnumType]>,
    structs: Box<[StructType]>,
    typedefs: Box<[TypedefType]>,
    services: Box<[ServiceType]>,
    constants: Box<[Constant]>,
}

impl ComponentTable for SchemaComponentTable {
    fn get<R>(&self, ref_: Ref<R>) -> &R
    where
        R: Component,
        ComponentTraits: HasArenaContainer<R>,
    {
        ComponentTraits::get_container_from_schema_table(self)
            .get(ref_.index())
            .expect("Invalid component reference (out-of-bounds)")
    }
}

macro_rules! has_arena_container_impl {
    ($type_name:ty, $field_name:ident) => {
        impl HasArenaContainer<$type_name> for ComponentTraits {
            fn get_container_from_construction_table(
                table: &ConstructionComponentTable,
            ) -> &[Option<$type_name>] {
                &table.$field_name
            }

            fn get_container_from_construction_table_mut(
                table: &mut ConstructionComponentTable,
            ) -> &mut Vec<Option<$type_name>> {
                &mut table.$field_name
            }

            fn get_container_from_schema_table(table: &SchemaComponentTable) -> &[$type_name] {
                &table.$field_name
            }
        }
    };
}

has_arena_container_impl!(EnumType, enums);
has_arena_container_impl!(StructType, structs);
has_arena_container_impl!(TypedefType, typedefs);
has_arena_container_impl!(ServiceType, services);
has_arena_container_impl!(Constant, constants);
