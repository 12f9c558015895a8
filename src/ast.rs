//! Statement and expression nodes. The parser builds one tree per program;
//! every node evaluates itself against a closure and the execution context.

use std::rc::Rc;

use crate::runtime::{Class, ClassInstance, Closure, Context, Object, ObjectHolder, RuntimeError};

/// Why execution of a node stopped early: a runtime failure, or a `return`
/// value travelling to the method body that will absorb it. Intermediate
/// nodes propagate a `Return` untouched via `?`; only `MethodBody` converts
/// it back into a normal result.
#[derive(Debug)]
pub enum Unwind {
    Error(RuntimeError),
    Return(ObjectHolder),
}

impl From<RuntimeError> for Unwind {
    fn from(error: RuntimeError) -> Self {
        Unwind::Error(error)
    }
}

pub type ExecResult = Result<ObjectHolder, Unwind>;

/// Comparison predicate plugged into a `Comparison` node; one of the six
/// predicate functions in `runtime`.
pub type Comparator =
    fn(&ObjectHolder, &ObjectHolder, &mut dyn Context) -> Result<bool, RuntimeError>;

#[derive(Debug, Clone)]
pub enum Statement {
    /// Preconstructed value: number, string, and bool literals, and `None`.
    Constant { value: ObjectHolder },
    Assignment {
        var: String,
        rhs: Box<Statement>,
    },
    /// Dotted read: `x` or `x.a.b`. Every id before the last must resolve to
    /// a class instance.
    VariableValue { dotted_ids: Vec<String> },
    Print { args: Vec<Statement> },
    MethodCall {
        object: Box<Statement>,
        method: String,
        args: Vec<Statement>,
    },
    NewInstance {
        class: Rc<Class>,
        args: Vec<Statement>,
    },
    Stringify { arg: Box<Statement> },
    Add {
        lhs: Box<Statement>,
        rhs: Box<Statement>,
    },
    Sub {
        lhs: Box<Statement>,
        rhs: Box<Statement>,
    },
    Mult {
        lhs: Box<Statement>,
        rhs: Box<Statement>,
    },
    Div {
        lhs: Box<Statement>,
        rhs: Box<Statement>,
    },
    Or {
        lhs: Box<Statement>,
        rhs: Box<Statement>,
    },
    And {
        lhs: Box<Statement>,
        rhs: Box<Statement>,
    },
    Not { arg: Box<Statement> },
    Comparison {
        cmp: Comparator,
        lhs: Box<Statement>,
        rhs: Box<Statement>,
    },
    Compound { statements: Vec<Statement> },
    Return { statement: Box<Statement> },
    ClassDefinition { class: Rc<Class> },
    FieldAssignment {
        object: Box<Statement>,
        field_name: String,
        rhs: Box<Statement>,
    },
    IfElse {
        condition: Box<Statement>,
        if_body: Box<Statement>,
        else_body: Option<Box<Statement>>,
    },
    /// Implementation of one method. The only node that turns a travelling
    /// return signal back into a normal value.
    MethodBody { body: Box<Statement> },
}

impl Statement {
    /// Evaluates the node. Expression nodes yield their value; statement
    /// nodes yield an empty holder.
    pub fn execute(&self, closure: &mut Closure, ctx: &mut dyn Context) -> ExecResult {
        match self {
            Statement::Constant { value } => Ok(value.clone()),

            Statement::Assignment { var, rhs } => {
                let value = rhs.execute(closure, ctx)?;
                closure.insert(var.clone(), value.clone());
                Ok(value)
            }

            Statement::VariableValue { dotted_ids } => {
                let (first, path) = dotted_ids
                    .split_first()
                    .expect("variable path is never empty");
                let mut value = closure.get(first).cloned().ok_or_else(|| {
                    RuntimeError::UndefinedName {
                        name: first.clone(),
                    }
                })?;
                for field in path {
                    value = read_field(&value, field)?;
                }
                Ok(value)
            }

            Statement::Print { args } => {
                let mut line = Vec::new();
                let mut first = true;
                for arg in args {
                    let value = arg.execute(closure, ctx)?;
                    if !first {
                        line.push(b' ');
                    }
                    value.print(&mut line, ctx)?;
                    if args.len() == 1 {
                        break;
                    }
                    first = false;
                }
                line.push(b'\n');
                ctx.output()
                    .write_all(&line)
                    .map_err(|error| RuntimeError::OutputStream {
                        message: error.to_string(),
                    })?;
                Ok(ObjectHolder::none())
            }

            Statement::MethodCall {
                object,
                method,
                args,
            } => {
                let receiver = object.execute(closure, ctx)?;
                let mut call_args = Vec::with_capacity(args.len());
                for arg in args {
                    call_args.push(arg.execute(closure, ctx)?);
                }
                Ok(receiver.call_method(method, &call_args, ctx)?)
            }

            Statement::NewInstance { class, args } => {
                let instance =
                    ObjectHolder::own(Object::Instance(ClassInstance::new(class.clone())));
                if instance.has_method("__init__", args.len()) {
                    let mut call_args = Vec::with_capacity(args.len());
                    for arg in args {
                        call_args.push(arg.execute(closure, ctx)?);
                    }
                    instance.call_method("__init__", &call_args, ctx)?;
                }
                Ok(instance)
            }

            Statement::Stringify { arg } => {
                let value = arg.execute(closure, ctx)?;
                let mut rendered = Vec::new();
                value.print(&mut rendered, ctx)?;
                Ok(ObjectHolder::own(Object::String(
                    String::from_utf8_lossy(&rendered).into_owned(),
                )))
            }

            Statement::Add { lhs, rhs } => {
                let lhs = lhs.execute(closure, ctx)?;
                let rhs = rhs.execute(closure, ctx)?;
                if let (Some(l), Some(r)) = (lhs.as_number(), rhs.as_number()) {
                    return Ok(ObjectHolder::own(Object::Number(l + r)));
                }
                if let (Some(l), Some(r)) = (lhs.as_string(), rhs.as_string()) {
                    return Ok(ObjectHolder::own(Object::String(l + &r)));
                }
                if lhs.has_method("__add__", 1) {
                    return Ok(lhs.call_method("__add__", &[rhs], ctx)?);
                }
                Err(RuntimeError::UnsupportedOperands {
                    operation: "+",
                    lhs: lhs.type_name(),
                    rhs: rhs.type_name(),
                }
                .into())
            }

            Statement::Sub { lhs, rhs } => numeric_op(closure, ctx, lhs, rhs, "-", |l, r| Ok(l - r)),
            Statement::Mult { lhs, rhs } => {
                numeric_op(closure, ctx, lhs, rhs, "*", |l, r| Ok(l * r))
            }
            Statement::Div { lhs, rhs } => numeric_op(closure, ctx, lhs, rhs, "/", |l, r| {
                if r == 0 {
                    return Err(RuntimeError::DivisionByZero);
                }
                Ok(l / r)
            }),

            Statement::Or { lhs, rhs } => {
                let lhs = lhs.execute(closure, ctx)?;
                if lhs.as_bool().is_none() && lhs.as_number().is_none() {
                    return Err(RuntimeError::UnsupportedOperand {
                        operation: "or",
                        type_name: lhs.type_name(),
                    }
                    .into());
                }
                if lhs.is_true() {
                    return Ok(ObjectHolder::own(Object::Bool(true)));
                }
                let rhs = rhs.execute(closure, ctx)?;
                Ok(ObjectHolder::own(Object::Bool(rhs.is_true())))
            }

            Statement::And { lhs, rhs } => {
                let lhs = lhs.execute(closure, ctx)?;
                if lhs.as_bool().is_none() && lhs.as_number().is_none() {
                    return Err(RuntimeError::UnsupportedOperand {
                        operation: "and",
                        type_name: lhs.type_name(),
                    }
                    .into());
                }
                if !lhs.is_true() {
                    return Ok(ObjectHolder::own(Object::Bool(false)));
                }
                let rhs = rhs.execute(closure, ctx)?;
                Ok(ObjectHolder::own(Object::Bool(rhs.is_true())))
            }

            Statement::Not { arg } => {
                let value = arg.execute(closure, ctx)?;
                if value.as_bool().is_none() && value.as_number().is_none() {
                    return Err(RuntimeError::UnsupportedOperand {
                        operation: "not",
                        type_name: value.type_name(),
                    }
                    .into());
                }
                Ok(ObjectHolder::own(Object::Bool(!value.is_true())))
            }

            Statement::Comparison { cmp, lhs, rhs } => {
                let lhs = lhs.execute(closure, ctx)?;
                let rhs = rhs.execute(closure, ctx)?;
                Ok(ObjectHolder::own(Object::Bool(cmp(&lhs, &rhs, ctx)?)))
            }

            Statement::Compound { statements } => {
                for statement in statements {
                    statement.execute(closure, ctx)?;
                }
                Ok(ObjectHolder::none())
            }

            Statement::Return { statement } => {
                Err(Unwind::Return(statement.execute(closure, ctx)?))
            }

            Statement::ClassDefinition { class } => {
                let holder = ObjectHolder::own(Object::Class(class.clone()));
                closure.insert(class.name().to_string(), holder.clone());
                Ok(holder)
            }

            Statement::FieldAssignment {
                object,
                field_name,
                rhs,
            } => {
                let target = object.execute(closure, ctx)?;
                let value = rhs.execute(closure, ctx)?;
                write_field(&target, field_name, value)
            }

            Statement::IfElse {
                condition,
                if_body,
                else_body,
            } => {
                let condition = condition.execute(closure, ctx)?;
                if condition.is_true() {
                    if_body.execute(closure, ctx)
                } else if let Some(else_body) = else_body {
                    else_body.execute(closure, ctx)
                } else {
                    Ok(ObjectHolder::none())
                }
            }

            Statement::MethodBody { body } => match body.execute(closure, ctx) {
                Ok(value) => Ok(value),
                Err(Unwind::Return(value)) => Ok(value),
                Err(error) => Err(error),
            },
        }
    }
}

fn numeric_op(
    closure: &mut Closure,
    ctx: &mut dyn Context,
    lhs: &Statement,
    rhs: &Statement,
    operation: &'static str,
    apply: impl Fn(i64, i64) -> Result<i64, RuntimeError>,
) -> ExecResult {
    let lhs = lhs.execute(closure, ctx)?;
    let rhs = rhs.execute(closure, ctx)?;
    match (lhs.as_number(), rhs.as_number()) {
        (Some(l), Some(r)) => Ok(ObjectHolder::own(Object::Number(apply(l, r)?))),
        _ => Err(RuntimeError::UnsupportedOperands {
            operation,
            lhs: lhs.type_name(),
            rhs: rhs.type_name(),
        }
        .into()),
    }
}

fn read_field(holder: &ObjectHolder, field: &str) -> Result<ObjectHolder, RuntimeError> {
    let Some(object) = holder.try_object() else {
        return Err(RuntimeError::FieldAccessOnNonInstance {
            field: field.to_string(),
            type_name: "None",
        });
    };
    let value = match &*object.borrow() {
        Object::Instance(instance) => instance.fields().get(field).cloned().ok_or_else(|| {
            RuntimeError::UndefinedField {
                class: instance.class().name().to_string(),
                field: field.to_string(),
            }
        })?,
        other => {
            return Err(RuntimeError::FieldAccessOnNonInstance {
                field: field.to_string(),
                type_name: other.type_name(),
            });
        }
    };
    Ok(value)
}

fn write_field(holder: &ObjectHolder, field: &str, value: ObjectHolder) -> ExecResult {
    let Some(object) = holder.try_object() else {
        return Err(RuntimeError::FieldAccessOnNonInstance {
            field: field.to_string(),
            type_name: "None",
        }
        .into());
    };
    match &mut *object.borrow_mut() {
        Object::Instance(instance) => {
            instance.fields_mut().insert(field.to_string(), value.clone());
            Ok(value)
        }
        other => Err(RuntimeError::FieldAccessOnNonInstance {
            field: field.to_string(),
            type_name: other.type_name(),
        }
        .into()),
    }
}
