use std::any::Any;
use std::rc::Rc;
use std::sync::Arc;

/// Suffix appended to a subject's simple type name to name its policy.
pub const POLICY_SUFFIX: &str = "Policy";

/// Object-safe view of a value that can be authorized against.
///
/// Host types opt in, usually through [`impl_subject!`](crate::impl_subject).
/// `Box`, `Rc` and `Arc` forward to the value they point to, so a boxed
/// `Contract` is looked up as a `Contract`.
pub trait Subject: Any {
    /// Simple (unqualified) name of the concrete type, e.g. `Contract`.
    fn type_name(&self) -> &'static str {
        simple_type_name::<Self>()
    }

    /// The concrete value, used for lookup by runtime type and for downcasting.
    fn as_any(&self) -> &dyn Any;
}

/// Implements [`Subject`] for one or more types.
///
/// ```
/// struct Contract;
/// struct Invoice;
///
/// may_i::impl_subject!(Contract, Invoice);
/// ```
#[macro_export]
macro_rules! impl_subject {
    ($($subject:ty),+ $(,)?) => {
        $(
            impl $crate::Subject for $subject {
                fn as_any(&self) -> &dyn ::std::any::Any {
                    self
                }
            }
        )+
    };
}

impl<T: Subject + ?Sized> Subject for Box<T> {
    fn type_name(&self) -> &'static str {
        (**self).type_name()
    }

    fn as_any(&self) -> &dyn Any {
        (**self).as_any()
    }
}

impl<T: Subject + ?Sized> Subject for Rc<T> {
    fn type_name(&self) -> &'static str {
        (**self).type_name()
    }

    fn as_any(&self) -> &dyn Any {
        (**self).as_any()
    }
}

impl<T: Subject + ?Sized> Subject for Arc<T> {
    fn type_name(&self) -> &'static str {
        (**self).type_name()
    }

    fn as_any(&self) -> &dyn Any {
        (**self).as_any()
    }
}

/// Returns the type name of `T` with module path and generic arguments stripped.
///
/// `billing::model::Contract` becomes `Contract`.
pub fn simple_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = match full.find('<') {
        Some(index) => &full[..index],
        None => full,
    };
    base.rsplit("::").next().unwrap_or(base)
}

/// Name under which a policy predicate can refer to its subject: `Contract` -> `contract`.
pub fn accessor_name(type_name: &str) -> String {
    type_name.to_lowercase()
}

/// Conventional policy name for a subject type: `Contract` -> `ContractPolicy`.
pub fn policy_name(type_name: &str) -> String {
    format!("{}{}", type_name, POLICY_SUFFIX)
}
