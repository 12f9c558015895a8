//! Runtime object model: values, the shared ownership handle, classes with
//! inheritance-aware method tables, and the comparison primitives.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::io::{self, BufRead, Write};
use std::rc::{Rc, Weak};

use thiserror::Error;

use crate::ast::{Statement, Unwind};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Undefined name '{name}'")]
    UndefinedName { name: String },
    #[error("Instance of '{class}' has no field '{field}'")]
    UndefinedField { class: String, field: String },
    #[error("Cannot read field '{field}' of a {type_name} value")]
    FieldAccessOnNonInstance {
        field: String,
        type_name: &'static str,
    },
    #[error("Cannot call method '{method}' on a {type_name} value")]
    MethodCallOnNonInstance {
        method: String,
        type_name: &'static str,
    },
    #[error("Class '{class}' has no method '{method}' taking {argument_count} arguments")]
    UnknownMethod {
        class: String,
        method: String,
        argument_count: usize,
    },
    #[error("Unsupported operand types for '{operation}': {lhs} and {rhs}")]
    UnsupportedOperands {
        operation: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },
    #[error("Unsupported operand type for '{operation}': {type_name}")]
    UnsupportedOperand {
        operation: &'static str,
        type_name: &'static str,
    },
    #[error("Cannot compare {lhs} and {rhs} values")]
    IncomparableTypes {
        lhs: &'static str,
        rhs: &'static str,
    },
    #[error("Method '{method}' must return a bool, got {type_name}")]
    ComparisonNotBool {
        method: &'static str,
        type_name: &'static str,
    },
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Return outside of a method body")]
    ReturnOutsideMethod,
    #[error("Output stream failure: {message}")]
    OutputStream { message: String },
}

/// Execution context threaded through every node. Owns nothing; both streams
/// are borrowed for the duration of a run and never captured by objects.
pub trait Context {
    fn output(&mut self) -> &mut dyn Write;
    fn input(&mut self) -> &mut dyn BufRead;
}

/// Context over caller-provided streams; the driver wires stdin/stdout here.
pub struct StreamContext<'a> {
    output: &'a mut dyn Write,
    input: &'a mut dyn BufRead,
}

impl<'a> StreamContext<'a> {
    pub fn new(output: &'a mut dyn Write, input: &'a mut dyn BufRead) -> Self {
        Self { output, input }
    }
}

impl Context for StreamContext<'_> {
    fn output(&mut self) -> &mut dyn Write {
        self.output
    }

    fn input(&mut self) -> &mut dyn BufRead {
        self.input
    }
}

/// Captures interpreter output in memory; used by tests and the harness.
pub struct BufferContext {
    output: Vec<u8>,
    input: io::Empty,
}

impl BufferContext {
    pub fn new() -> Self {
        Self {
            output: Vec::new(),
            input: io::empty(),
        }
    }

    pub fn output_bytes(&self) -> &[u8] {
        &self.output
    }

    pub fn output_string(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

impl Default for BufferContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Context for BufferContext {
    fn output(&mut self) -> &mut dyn Write {
        &mut self.output
    }

    fn input(&mut self) -> &mut dyn BufRead {
        &mut self.input
    }
}

/// Name-to-holder map for one call frame or the top level.
pub type Closure = HashMap<String, ObjectHolder>;

/// A method declared on a class. Formal parameters do not include `self`;
/// the body is wrapped in a `MethodBody` node by the parser.
#[derive(Debug)]
pub struct Method {
    name: String,
    formal_params: Vec<String>,
    body: Statement,
}

impl Method {
    pub fn new(name: String, formal_params: Vec<String>, body: Statement) -> Self {
        Self {
            name,
            formal_params,
            body,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn formal_params(&self) -> &[String] {
        &self.formal_params
    }

    pub fn body(&self) -> &Statement {
        &self.body
    }
}

/// A class: its own methods in declaration order plus a lookup table that
/// resolves a name to the most-derived definition. The table is built once
/// at construction, parent entries first, so dispatch never walks the
/// parent chain.
#[derive(Debug)]
pub struct Class {
    name: String,
    methods: Vec<Rc<Method>>,
    table: HashMap<String, Rc<Method>>,
    parent: Option<Rc<Class>>,
}

impl Class {
    pub fn new(name: String, methods: Vec<Method>, parent: Option<Rc<Class>>) -> Self {
        let methods: Vec<Rc<Method>> = methods.into_iter().map(Rc::new).collect();
        let mut table = parent
            .as_ref()
            .map(|parent| parent.table.clone())
            .unwrap_or_default();
        for method in &methods {
            table.insert(method.name().to_string(), method.clone());
        }
        Self {
            name,
            methods,
            table,
            parent,
        }
    }

    /// Most-derived method with this name, if any.
    pub fn method(&self, name: &str) -> Option<&Rc<Method>> {
        self.table.get(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn methods(&self) -> &[Rc<Method>] {
        &self.methods
    }

    pub fn parent(&self) -> Option<&Rc<Class>> {
        self.parent.as_ref()
    }
}

/// A runtime object carrying a reference to its class and a mutable field
/// table.
#[derive(Debug)]
pub struct ClassInstance {
    class: Rc<Class>,
    fields: Closure,
}

impl ClassInstance {
    pub fn new(class: Rc<Class>) -> Self {
        Self {
            class,
            fields: Closure::new(),
        }
    }

    pub fn class(&self) -> Rc<Class> {
        self.class.clone()
    }

    pub fn fields(&self) -> &Closure {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut Closure {
        &mut self.fields
    }
}

/// A heap value. Every variant knows how to render itself into a byte
/// buffer; instances defer to their `__str__` when one is defined.
#[derive(Debug)]
pub enum Object {
    Number(i64),
    String(String),
    Bool(bool),
    Class(Rc<Class>),
    Instance(ClassInstance),
}

impl Object {
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Number(_) => "number",
            Object::String(_) => "string",
            Object::Bool(_) => "bool",
            Object::Class(_) => "class",
            Object::Instance(_) => "class instance",
        }
    }
}

#[derive(Clone)]
enum Repr {
    Empty,
    Owned(Rc<RefCell<Object>>),
    Shared(Weak<RefCell<Object>>),
}

/// Handle to a runtime object. An empty holder is the language's `None`; a
/// shared holder borrows an object owned elsewhere (the `self` binding of a
/// method call) and must not outlive the call frame it was created for.
#[derive(Clone)]
pub struct ObjectHolder(Repr);

impl ObjectHolder {
    pub fn none() -> Self {
        Self(Repr::Empty)
    }

    pub fn own(object: Object) -> Self {
        Self(Repr::Owned(Rc::new(RefCell::new(object))))
    }

    /// Non-owning handle to an object owned elsewhere. Does not extend the
    /// object's lifetime.
    pub fn share(object: &Rc<RefCell<Object>>) -> Self {
        Self(Repr::Shared(Rc::downgrade(object)))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.0, Repr::Empty)
    }

    /// Strong reference to the held object. Panics on an empty holder; use
    /// `try_object` wherever emptiness is a legal program state.
    pub fn object(&self) -> Rc<RefCell<Object>> {
        self.try_object().expect("dereferenced an empty object holder")
    }

    pub fn try_object(&self) -> Option<Rc<RefCell<Object>>> {
        match &self.0 {
            Repr::Empty => None,
            Repr::Owned(object) => Some(object.clone()),
            Repr::Shared(object) => {
                Some(object.upgrade().expect("shared holder outlived its object"))
            }
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self.try_object() {
            Some(object) => object.borrow().type_name(),
            None => "None",
        }
    }

    pub fn as_number(&self) -> Option<i64> {
        let object = self.try_object()?;
        let value = match &*object.borrow() {
            Object::Number(value) => Some(*value),
            _ => None,
        };
        value
    }

    pub fn as_bool(&self) -> Option<bool> {
        let object = self.try_object()?;
        let value = match &*object.borrow() {
            Object::Bool(value) => Some(*value),
            _ => None,
        };
        value
    }

    pub fn as_string(&self) -> Option<String> {
        let object = self.try_object()?;
        let value = match &*object.borrow() {
            Object::String(value) => Some(value.clone()),
            _ => None,
        };
        value
    }

    pub fn instance_class(&self) -> Option<Rc<Class>> {
        let object = self.try_object()?;
        let class = match &*object.borrow() {
            Object::Instance(instance) => Some(instance.class()),
            _ => None,
        };
        class
    }

    /// Truthiness is total: anything that is not a non-zero number, a
    /// non-empty string, or `True` is falsy.
    pub fn is_true(&self) -> bool {
        let Some(object) = self.try_object() else {
            return false;
        };
        let truthy = match &*object.borrow() {
            Object::Number(value) => *value != 0,
            Object::String(value) => !value.is_empty(),
            Object::Bool(value) => *value,
            Object::Class(_) | Object::Instance(_) => false,
        };
        truthy
    }

    /// True when the holder is an instance whose class has a method with
    /// this name and exactly this many formal parameters.
    pub fn has_method(&self, method: &str, argument_count: usize) -> bool {
        self.instance_class()
            .and_then(|class| {
                class
                    .method(method)
                    .map(|found| found.formal_params().len() == argument_count)
            })
            .unwrap_or(false)
    }

    /// Invokes `method` on the held instance. The call frame binds `self` as
    /// a non-owning holder, then the formal parameters by position.
    pub fn call_method(
        &self,
        method: &str,
        args: &[ObjectHolder],
        ctx: &mut dyn Context,
    ) -> Result<ObjectHolder, RuntimeError> {
        let Some(object) = self.try_object() else {
            return Err(RuntimeError::MethodCallOnNonInstance {
                method: method.to_string(),
                type_name: "None",
            });
        };
        let class = match &*object.borrow() {
            Object::Instance(instance) => instance.class(),
            other => {
                return Err(RuntimeError::MethodCallOnNonInstance {
                    method: method.to_string(),
                    type_name: other.type_name(),
                });
            }
        };
        let Some(found) = class
            .method(method)
            .filter(|found| found.formal_params().len() == args.len())
            .cloned()
        else {
            return Err(RuntimeError::UnknownMethod {
                class: class.name().to_string(),
                method: method.to_string(),
                argument_count: args.len(),
            });
        };

        let mut scope = Closure::new();
        scope.insert("self".to_string(), ObjectHolder::share(&object));
        for (param, arg) in found.formal_params().iter().zip(args) {
            scope.insert(param.clone(), arg.clone());
        }
        // The body is a `MethodBody` node and absorbs return signals itself;
        // a signal escaping an unwrapped body is still delivered here, at
        // the same call boundary.
        match found.body().execute(&mut scope, ctx) {
            Ok(value) => Ok(value),
            Err(Unwind::Return(value)) => Ok(value),
            Err(Unwind::Error(error)) => Err(error),
        }
    }

    /// Renders the value into `out`. Numbers print in decimal, strings raw,
    /// bools as `True`/`False`, classes as `Class <name>`; an instance goes
    /// through its `__str__` when one is defined and otherwise prints an
    /// identity tag. An empty holder prints `None`.
    pub fn print(&self, out: &mut Vec<u8>, ctx: &mut dyn Context) -> Result<(), RuntimeError> {
        let Some(object) = self.try_object() else {
            out.extend_from_slice(b"None");
            return Ok(());
        };
        let rendered = match &*object.borrow() {
            Object::Number(value) => Some(value.to_string()),
            Object::String(value) => Some(value.clone()),
            Object::Bool(value) => Some(if *value { "True" } else { "False" }.to_string()),
            Object::Class(class) => Some(format!("Class {}", class.name())),
            Object::Instance(_) => None,
        };
        match rendered {
            Some(text) => {
                out.extend_from_slice(text.as_bytes());
                Ok(())
            }
            None if self.has_method("__str__", 0) => {
                let value = self.call_method("__str__", &[], ctx)?;
                value.print(out, ctx)
            }
            None => {
                let class = self.instance_class().expect("non-instance rendered above");
                let tag = format!("<{} object at {:p}>", class.name(), Rc::as_ptr(&object));
                out.extend_from_slice(tag.as_bytes());
                Ok(())
            }
        }
    }
}

impl fmt::Debug for ObjectHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Holder({})", self.type_name())
    }
}

/// Structural equality for numbers, strings, and bools; two empty holders
/// are equal; an instance with `__eq__` decides for itself and must answer
/// with a bool.
pub fn equal(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    ctx: &mut dyn Context,
) -> Result<bool, RuntimeError> {
    if let (Some(l), Some(r)) = (lhs.as_number(), rhs.as_number()) {
        return Ok(l == r);
    }
    if let (Some(l), Some(r)) = (lhs.as_string(), rhs.as_string()) {
        return Ok(l == r);
    }
    if let (Some(l), Some(r)) = (lhs.as_bool(), rhs.as_bool()) {
        return Ok(l == r);
    }
    if lhs.is_empty() && rhs.is_empty() {
        return Ok(true);
    }
    if lhs.has_method("__eq__", 1) {
        let result = lhs.call_method("__eq__", &[rhs.clone()], ctx)?;
        return result.as_bool().ok_or_else(|| RuntimeError::ComparisonNotBool {
            method: "__eq__",
            type_name: result.type_name(),
        });
    }
    Err(RuntimeError::IncomparableTypes {
        lhs: lhs.type_name(),
        rhs: rhs.type_name(),
    })
}

/// Same-type ordering for numbers, strings, and bools; an instance with
/// `__lt__` decides for itself.
pub fn less(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    ctx: &mut dyn Context,
) -> Result<bool, RuntimeError> {
    if let (Some(l), Some(r)) = (lhs.as_number(), rhs.as_number()) {
        return Ok(l < r);
    }
    if let (Some(l), Some(r)) = (lhs.as_string(), rhs.as_string()) {
        return Ok(l < r);
    }
    if let (Some(l), Some(r)) = (lhs.as_bool(), rhs.as_bool()) {
        return Ok(!l && r);
    }
    if lhs.has_method("__lt__", 1) {
        let result = lhs.call_method("__lt__", &[rhs.clone()], ctx)?;
        return result.as_bool().ok_or_else(|| RuntimeError::ComparisonNotBool {
            method: "__lt__",
            type_name: result.type_name(),
        });
    }
    Err(RuntimeError::IncomparableTypes {
        lhs: lhs.type_name(),
        rhs: rhs.type_name(),
    })
}

pub fn not_equal(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    ctx: &mut dyn Context,
) -> Result<bool, RuntimeError> {
    Ok(!equal(lhs, rhs, ctx)?)
}

pub fn greater(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    ctx: &mut dyn Context,
) -> Result<bool, RuntimeError> {
    Ok(!less(lhs, rhs, ctx)? && !equal(lhs, rhs, ctx)?)
}

pub fn less_or_equal(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    ctx: &mut dyn Context,
) -> Result<bool, RuntimeError> {
    Ok(!greater(lhs, rhs, ctx)?)
}

pub fn greater_or_equal(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    ctx: &mut dyn Context,
) -> Result<bool, RuntimeError> {
    Ok(!less(lhs, rhs, ctx)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Statement;

    fn number(value: i64) -> ObjectHolder {
        ObjectHolder::own(Object::Number(value))
    }

    fn string(value: &str) -> ObjectHolder {
        ObjectHolder::own(Object::String(value.to_string()))
    }

    fn boolean(value: bool) -> ObjectHolder {
        ObjectHolder::own(Object::Bool(value))
    }

    fn variable(path: &[&str]) -> Statement {
        Statement::VariableValue {
            dotted_ids: path.iter().map(|id| id.to_string()).collect(),
        }
    }

    fn method_returning(name: &str, formal_params: &[&str], result: Statement) -> Method {
        Method::new(
            name.to_string(),
            formal_params.iter().map(|param| param.to_string()).collect(),
            Statement::MethodBody {
                body: Box::new(Statement::Return {
                    statement: Box::new(result),
                }),
            },
        )
    }

    /// Class whose instances carry a `value` field and compare through it.
    fn measured_class() -> Rc<Class> {
        Rc::new(Class::new(
            "Measured".to_string(),
            vec![
                method_returning(
                    "__eq__",
                    &["other"],
                    Statement::Comparison {
                        cmp: equal,
                        lhs: Box::new(variable(&["self", "value"])),
                        rhs: Box::new(variable(&["other", "value"])),
                    },
                ),
                method_returning(
                    "__lt__",
                    &["other"],
                    Statement::Comparison {
                        cmp: less,
                        lhs: Box::new(variable(&["self", "value"])),
                        rhs: Box::new(variable(&["other", "value"])),
                    },
                ),
            ],
            None,
        ))
    }

    fn instance_with_value(class: &Rc<Class>, value: i64) -> ObjectHolder {
        let holder = ObjectHolder::own(Object::Instance(ClassInstance::new(class.clone())));
        let object = holder.object();
        match &mut *object.borrow_mut() {
            Object::Instance(instance) => {
                instance.fields_mut().insert("value".to_string(), number(value));
            }
            _ => unreachable!("holder was built from an instance"),
        }
        holder
    }

    #[test]
    fn truthiness_is_total_over_all_variants() {
        assert!(number(7).is_true());
        assert!(!number(0).is_true());
        assert!(string("x").is_true());
        assert!(!string("").is_true());
        assert!(boolean(true).is_true());
        assert!(!boolean(false).is_true());
        assert!(!ObjectHolder::none().is_true());

        let class = measured_class();
        assert!(!ObjectHolder::own(Object::Class(class.clone())).is_true());
        assert!(!instance_with_value(&class, 1).is_true());
    }

    #[test]
    fn equality_compares_values_of_the_same_type() {
        let mut ctx = BufferContext::new();
        assert!(equal(&number(3), &number(3), &mut ctx).expect("comparable"));
        assert!(!equal(&number(3), &number(4), &mut ctx).expect("comparable"));
        assert!(equal(&string("ab"), &string("ab"), &mut ctx).expect("comparable"));
        assert!(equal(&boolean(false), &boolean(false), &mut ctx).expect("comparable"));
        assert!(equal(&ObjectHolder::none(), &ObjectHolder::none(), &mut ctx).expect("comparable"));
    }

    #[test]
    fn equality_is_reflexive_where_defined() {
        let mut ctx = BufferContext::new();
        for holder in [number(5), string("s"), boolean(true), ObjectHolder::none()] {
            assert!(equal(&holder, &holder, &mut ctx).expect("comparable"));
        }
    }

    #[test]
    fn mixed_types_are_incomparable() {
        let mut ctx = BufferContext::new();
        assert_eq!(
            equal(&number(1), &string("1"), &mut ctx).expect_err("expected type error"),
            RuntimeError::IncomparableTypes {
                lhs: "number",
                rhs: "string"
            }
        );
        assert_eq!(
            less(&ObjectHolder::none(), &number(1), &mut ctx).expect_err("expected type error"),
            RuntimeError::IncomparableTypes {
                lhs: "None",
                rhs: "number"
            }
        );
    }

    #[test]
    fn less_orders_numbers_strings_and_bools() {
        let mut ctx = BufferContext::new();
        assert!(less(&number(1), &number(2), &mut ctx).expect("comparable"));
        assert!(!less(&number(2), &number(2), &mut ctx).expect("comparable"));
        assert!(less(&string("abc"), &string("abd"), &mut ctx).expect("comparable"));
        assert!(less(&boolean(false), &boolean(true), &mut ctx).expect("comparable"));
        assert!(!less(&boolean(true), &boolean(true), &mut ctx).expect("comparable"));
    }

    #[test]
    fn derived_predicates_follow_equal_and_less() {
        let mut ctx = BufferContext::new();
        assert!(not_equal(&number(1), &number(2), &mut ctx).expect("comparable"));
        assert!(greater(&number(3), &number(2), &mut ctx).expect("comparable"));
        assert!(!greater(&number(2), &number(2), &mut ctx).expect("comparable"));
        assert!(less_or_equal(&number(2), &number(2), &mut ctx).expect("comparable"));
        assert!(greater_or_equal(&number(2), &number(2), &mut ctx).expect("comparable"));
        assert!(!greater_or_equal(&number(1), &number(2), &mut ctx).expect("comparable"));
    }

    #[test]
    fn instances_compare_through_their_dunder_methods() {
        let mut ctx = BufferContext::new();
        let class = measured_class();
        let a = instance_with_value(&class, 3);
        let b = instance_with_value(&class, 4);
        assert!(!equal(&a, &b, &mut ctx).expect("comparable"));
        assert!(equal(&a, &a, &mut ctx).expect("comparable"));
        assert!(less(&a, &b, &mut ctx).expect("comparable"));
        assert!(greater(&b, &a, &mut ctx).expect("comparable"));
    }

    #[test]
    fn dunder_comparisons_must_return_bool() {
        let mut ctx = BufferContext::new();
        let class = Rc::new(Class::new(
            "Odd".to_string(),
            vec![method_returning(
                "__eq__",
                &["other"],
                Statement::Constant { value: number(1) },
            )],
            None,
        ));
        let instance = ObjectHolder::own(Object::Instance(ClassInstance::new(class)));
        assert_eq!(
            equal(&instance, &number(1), &mut ctx).expect_err("expected type error"),
            RuntimeError::ComparisonNotBool {
                method: "__eq__",
                type_name: "number"
            }
        );
    }

    #[test]
    fn method_table_resolves_to_the_most_derived_definition() {
        let parent = Rc::new(Class::new(
            "Parent".to_string(),
            vec![
                method_returning("describe", &[], Statement::Constant { value: number(1) }),
                method_returning("base_only", &[], Statement::Constant { value: number(10) }),
            ],
            None,
        ));
        let child = Rc::new(Class::new(
            "Child".to_string(),
            vec![method_returning(
                "describe",
                &[],
                Statement::Constant { value: number(2) },
            )],
            Some(parent.clone()),
        ));

        let mut ctx = BufferContext::new();
        let instance = ObjectHolder::own(Object::Instance(ClassInstance::new(child.clone())));
        let result = instance
            .call_method("describe", &[], &mut ctx)
            .expect("method call should succeed");
        assert_eq!(result.as_number(), Some(2));

        let inherited = instance
            .call_method("base_only", &[], &mut ctx)
            .expect("inherited call should succeed");
        assert_eq!(inherited.as_number(), Some(10));

        assert_eq!(child.method("missing").map(|m| m.name()), None);
        assert_eq!(parent.method("describe").map(|m| m.name()), Some("describe"));
    }

    #[test]
    fn has_method_checks_name_and_arity() {
        let class = measured_class();
        let instance = instance_with_value(&class, 1);
        assert!(instance.has_method("__eq__", 1));
        assert!(!instance.has_method("__eq__", 0));
        assert!(!instance.has_method("__missing__", 1));
        assert!(!number(1).has_method("__eq__", 1));
    }

    #[test]
    fn call_binds_self_and_formal_parameters() {
        let class = Rc::new(Class::new(
            "Adder".to_string(),
            vec![method_returning(
                "plus",
                &["amount"],
                Statement::Add {
                    lhs: Box::new(variable(&["self", "value"])),
                    rhs: Box::new(variable(&["amount"])),
                },
            )],
            None,
        ));
        let instance = instance_with_value(&class, 40);
        let mut ctx = BufferContext::new();
        let result = instance
            .call_method("plus", &[number(2)], &mut ctx)
            .expect("method call should succeed");
        assert_eq!(result.as_number(), Some(42));
    }

    #[test]
    fn calling_missing_or_mismatched_methods_fails() {
        let class = measured_class();
        let instance = instance_with_value(&class, 1);
        let mut ctx = BufferContext::new();
        assert_eq!(
            instance
                .call_method("__eq__", &[], &mut ctx)
                .expect_err("expected arity failure"),
            RuntimeError::UnknownMethod {
                class: "Measured".to_string(),
                method: "__eq__".to_string(),
                argument_count: 0
            }
        );
        assert_eq!(
            number(1)
                .call_method("anything", &[], &mut ctx)
                .expect_err("expected non-instance failure"),
            RuntimeError::MethodCallOnNonInstance {
                method: "anything".to_string(),
                type_name: "number"
            }
        );
    }

    #[test]
    fn shared_holders_do_not_extend_the_object_lifetime() {
        let holder = ObjectHolder::own(Object::Number(7));
        let object = holder.object();
        let shared = ObjectHolder::share(&object);
        assert_eq!(Rc::strong_count(&object), 2);
        assert_eq!(shared.as_number(), Some(7));
        assert_eq!(Rc::strong_count(&object), 2);
    }

    #[test]
    fn prints_every_plain_variant() {
        let mut ctx = BufferContext::new();
        let mut out = Vec::new();
        for (holder, expected) in [
            (number(-3), "-3"),
            (string("raw text"), "raw text"),
            (boolean(true), "True"),
            (boolean(false), "False"),
            (ObjectHolder::none(), "None"),
            (
                ObjectHolder::own(Object::Class(measured_class())),
                "Class Measured",
            ),
        ] {
            out.clear();
            holder.print(&mut out, &mut ctx).expect("print should succeed");
            assert_eq!(String::from_utf8_lossy(&out), expected);
        }
    }

    #[test]
    fn instances_print_through_str_when_defined() {
        let class = Rc::new(Class::new(
            "Named".to_string(),
            vec![method_returning(
                "__str__",
                &[],
                Statement::Constant {
                    value: string("a named thing"),
                },
            )],
            None,
        ));
        let instance = ObjectHolder::own(Object::Instance(ClassInstance::new(class)));
        let mut ctx = BufferContext::new();
        let mut out = Vec::new();
        instance.print(&mut out, &mut ctx).expect("print should succeed");
        assert_eq!(String::from_utf8_lossy(&out), "a named thing");
    }

    #[test]
    fn instances_without_str_print_an_identity_tag() {
        let instance =
            ObjectHolder::own(Object::Instance(ClassInstance::new(measured_class())));
        let mut ctx = BufferContext::new();
        let mut out = Vec::new();
        instance.print(&mut out, &mut ctx).expect("print should succeed");
        let tag = String::from_utf8_lossy(&out);
        assert!(tag.starts_with("<Measured object at "));
        assert!(tag.ends_with('>'));
    }

    #[test]
    #[should_panic(expected = "dereferenced an empty object holder")]
    fn dereferencing_an_empty_holder_is_an_invariant_violation() {
        ObjectHolder::none().object();
    }
}
