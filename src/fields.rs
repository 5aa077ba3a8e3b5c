/*!
Explicit declaration of the bindable fields of a structure.

A structure implements [`Bind`] (usually through `#[derive(Bind)]`) by
describing each of its bound fields to a [`Fields`] collector: the field's
name, its binding tag, its description, and an accessor that projects the
structure onto the field. The field's type determines its shape:

- [`Fields::value`] for a plain `V` (including `bool`)
- [`Fields::pointer`] for an `Option<V>`, which becomes `Some` once set
- [`Fields::slice`] for a `Vec<V>`, which is appended to
- [`Fields::embed`] for a nested structure that itself implements [`Bind`],
  whose fields are flattened in place

```
use optbind::{Bind, Fields};

#[derive(Default)]
struct Options {
    verbose: bool,
    port: Option<String>,
}

impl Bind for Options {
    fn declare(fields: &mut Fields<Self>) {
        fields
            .value("verbose", "-v,--verbose", "Display more output", |this: &mut Self| {
                &mut this.verbose
            })
            .pointer("port", "-p,--port", "Serial port to open", |this: &mut Self| {
                &mut this.port
            });
    }
}
```
 */

use std::any::{Any, TypeId, type_name};
use std::rc::Rc;

/// A structure whose fields can be bound to options.
pub trait Bind: Sized + 'static {
    /// Describe every bound field of the structure, in declaration order
    fn declare(fields: &mut Fields<Self>);
}

/// Type-erased writer for a single field of a `T`
pub(crate) trait Slot<T> {
    /// Write a parsed value into the field. `value` always has the value
    /// type of the field.
    fn store(&self, target: &mut T, value: Box<dyn Any>);

    /// Empty a sequence field
    fn reset(&self, target: &mut T) {
        let _ = target;
        unreachable!("only sequence fields can be reset")
    }
}

type Accessor<T, F> = Box<dyn Fn(&mut T) -> &mut F>;

fn downcast<V: Any>(value: Box<dyn Any>) -> V {
    match value.downcast::<V>() {
        Ok(value) => *value,
        Err(_) => unreachable!("values are always parsed as the type of their field"),
    }
}

struct ValueSlot<T, V> {
    access: Accessor<T, V>,
}

impl<T, V: Any> Slot<T> for ValueSlot<T, V> {
    fn store(&self, target: &mut T, value: Box<dyn Any>) {
        *(self.access)(target) = downcast(value);
    }
}

struct PointerSlot<T, V> {
    access: Accessor<T, Option<V>>,
}

impl<T, V: Any> Slot<T> for PointerSlot<T, V> {
    fn store(&self, target: &mut T, value: Box<dyn Any>) {
        *(self.access)(target) = Some(downcast(value));
    }
}

struct SliceSlot<T, V> {
    access: Accessor<T, Vec<V>>,
}

impl<T, V: Any> Slot<T> for SliceSlot<T, V> {
    fn store(&self, target: &mut T, value: Box<dyn Any>) {
        (self.access)(target).push(downcast(value));
    }

    fn reset(&self, target: &mut T) {
        (self.access)(target).clear();
    }
}

/// A slot of an embedded structure, reached through the outer structure
struct EmbeddedSlot<T, U> {
    access: Rc<dyn Fn(&mut T) -> &mut U>,
    inner: Box<dyn Slot<U>>,
}

impl<T, U> Slot<T> for EmbeddedSlot<T, U> {
    fn store(&self, target: &mut T, value: Box<dyn Any>) {
        self.inner.store((self.access)(target), value);
    }

    fn reset(&self, target: &mut T) {
        self.inner.reset((self.access)(target));
    }
}

/// The shape of a field's type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Shape {
    Value,
    Pointer,
    Slice,
}

/// A single declared field, before its tag is parsed
pub(crate) struct Declaration<T> {
    pub field: &'static str,
    pub tag: String,
    pub description: String,
    pub shape: Shape,

    /// The type parsed from strings; the element type for `Option` and `Vec`
    pub value_type: TypeId,
    pub value_type_name: &'static str,

    /// The whole type of the field, for error messages
    pub field_type_name: &'static str,

    pub slot: Box<dyn Slot<T>>,
}

impl<T: 'static> Declaration<T> {
    /// Re-target this declaration at a structure embedding `T`
    fn embedded<O: 'static>(self, access: Rc<dyn Fn(&mut O) -> &mut T>) -> Declaration<O> {
        Declaration {
            field: self.field,
            tag: self.tag,
            description: self.description,
            shape: self.shape,
            value_type: self.value_type,
            value_type_name: self.value_type_name,
            field_type_name: self.field_type_name,
            slot: Box::new(EmbeddedSlot {
                access,
                inner: self.slot,
            }),
        }
    }
}

/// Collector of field declarations, passed to [`Bind::declare`]. See the
/// [module docs][crate::fields].
pub struct Fields<T> {
    pub(crate) declarations: Vec<Declaration<T>>,
}

impl<T> Default for Fields<T> {
    fn default() -> Self {
        Self {
            declarations: Vec::new(),
        }
    }
}

impl<T: 'static> Fields<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the declarations of a [`Bind`] structure
    #[must_use]
    pub fn of() -> Self
    where
        T: Bind,
    {
        let mut fields = Self::new();
        T::declare(&mut fields);
        fields
    }

    fn push<V: Any, F>(
        &mut self,
        field: &'static str,
        tag: &str,
        description: &str,
        shape: Shape,
        slot: Box<dyn Slot<T>>,
    ) -> &mut Self {
        self.declarations.push(Declaration {
            field,
            tag: tag.to_owned(),
            description: description.to_owned(),
            shape,
            value_type: TypeId::of::<V>(),
            value_type_name: type_name::<V>(),
            field_type_name: type_name::<F>(),
            slot,
        });

        self
    }

    /// Declare a plain field. A `bool` field becomes a boolean flag.
    pub fn value<V: Any>(
        &mut self,
        field: &'static str,
        tag: &str,
        description: &str,
        access: impl Fn(&mut T) -> &mut V + 'static,
    ) -> &mut Self {
        let slot: ValueSlot<T, V> = ValueSlot {
            access: Box::new(access),
        };

        self.push::<V, V>(field, tag, description, Shape::Value, Box::new(slot))
    }

    /// Declare an `Option<V>` field
    pub fn pointer<V: Any>(
        &mut self,
        field: &'static str,
        tag: &str,
        description: &str,
        access: impl Fn(&mut T) -> &mut Option<V> + 'static,
    ) -> &mut Self {
        let slot: PointerSlot<T, V> = PointerSlot {
            access: Box::new(access),
        };

        self.push::<V, Option<V>>(field, tag, description, Shape::Pointer, Box::new(slot))
    }

    /// Declare a `Vec<V>` field
    pub fn slice<V: Any>(
        &mut self,
        field: &'static str,
        tag: &str,
        description: &str,
        access: impl Fn(&mut T) -> &mut Vec<V> + 'static,
    ) -> &mut Self {
        let slot: SliceSlot<T, V> = SliceSlot {
            access: Box::new(access),
        };

        self.push::<V, Vec<V>>(field, tag, description, Shape::Slice, Box::new(slot))
    }

    /// Declare an embedded structure. Its fields are flattened into this
    /// structure at this point of the declaration order.
    pub fn embed<U: Bind>(&mut self, access: impl Fn(&mut T) -> &mut U + 'static) -> &mut Self {
        let access: Rc<dyn Fn(&mut T) -> &mut U> = Rc::new(access);

        log::trace!("embedding {} into {}", type_name::<U>(), type_name::<T>());

        self.declarations.extend(
            Fields::<U>::of()
                .declarations
                .into_iter()
                .map(|declaration| declaration.embedded(Rc::clone(&access))),
        );

        self
    }

    /// The names of the declared fields, in order
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.declarations.iter().map(|declaration| declaration.field)
    }
}
