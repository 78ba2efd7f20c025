use std::fmt;

use crate::scheduler::{Receive, RunStats, Scheduler, Step, Task};
use crate::types::{
    Arg, Callee, Continuation, EachMode, Environment, EvalError, EvalSnapshot, HostData, NodeId,
    OpError, OpKey, Operand, OperationPool, Outcome, Registry, Scope, Thunk, Value,
};

/// Read-only data shared by every frame of one evaluation.
#[derive(Clone, Copy)]
pub(crate) struct Shared<'a> {
    pub(crate) object: &'a dyn HostData,
    pub(crate) registry: &'a Registry,
    pub(crate) pool: &'a OperationPool,
}

enum Slot {
    Ready(Arg),
    Pending(NodeId),
}

enum Entry {
    Op { key: OpKey, slots: Vec<Slot> },
    Value(Value),
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Value(v) => write!(f, "{v}"),
            Entry::Op { key, slots } => {
                write!(f, "{}(", key.name())?;
                for (i, slot) in slots.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match slot {
                        Slot::Pending(id) => write!(f, "{id}")?,
                        Slot::Ready(Arg::Value(v)) => write!(f, "{v}")?,
                        Slot::Ready(Arg::Deferred(t)) => write!(f, "~{}", t.operand())?,
                        Slot::Ready(Arg::Block(op)) => write!(f, "{{{op}}}")?,
                    }
                }
                write!(f, ")")
            }
        }
    }
}

/// Evaluates one operand: a stack of partially resolved operations.
pub(crate) struct EvalFrame<'a> {
    shared: Shared<'a>,
    env: Environment,
    stack: Vec<Entry>,
}

/// Applies a callee to list elements one at a time, left to right.
pub(crate) struct EachFrame<'a> {
    shared: Shared<'a>,
    env: Environment,
    callee: Callee,
    mode: EachMode,
    items: std::vec::IntoIter<Value>,
    current: Option<Value>,
    out: Vec<Value>,
}

/// Enumerates host keys, one per step.
pub(crate) struct KeysFrame {
    keys: std::vec::IntoIter<String>,
    out: Vec<Value>,
}

pub(crate) enum Frame<'a> {
    Eval(EvalFrame<'a>),
    Each(EachFrame<'a>),
    Keys(KeysFrame),
}

type EvalStep<'a> = Step<Frame<'a>, Value, EvalError>;
type EvalTask<'a> = Task<Frame<'a>, Value, EvalError>;

fn internal(message: &str) -> EvalError {
    EvalError::Internal(message.to_owned())
}

impl<'a> EvalFrame<'a> {
    fn start(shared: Shared<'a>, env: Environment, operand: &Operand) -> Result<Self, EvalError> {
        let mut frame = Self {
            shared,
            env,
            stack: Vec::new(),
        };
        let mut operand = operand;
        while let Operand::Skip(inner) = operand {
            operand = inner.as_ref();
        }
        match operand {
            Operand::Literal(s) => frame.stack.push(Entry::Value(Value::Str(s.clone()))),
            Operand::Node(id) => frame.push_node(*id)?,
            Operand::Block(_) => return Err(EvalError::BareBlock),
            Operand::Skip(_) => return Err(internal("unwrapped skip")),
        }
        Ok(frame)
    }

    fn push_node(&mut self, id: NodeId) -> Result<(), EvalError> {
        let node = self
            .shared
            .pool
            .get(id)
            .ok_or_else(|| internal("dangling node reference"))?;
        let slots = node
            .operands()
            .iter()
            .map(|operand| match operand {
                Operand::Literal(s) => Slot::Ready(Arg::Value(Value::Str(s.clone()))),
                Operand::Node(id) => Slot::Pending(*id),
                Operand::Block(inner) => Slot::Ready(Arg::Block((**inner).clone())),
                Operand::Skip(inner) => {
                    Slot::Ready(Arg::Deferred(Thunk::new((**inner).clone(), self.env.clone())))
                }
            })
            .collect();
        self.stack.push(Entry::Op {
            key: node.op().clone(),
            slots,
        });
        Ok(())
    }

    /// Hand a finished value to the first pending slot of the operation on top.
    fn fill(&mut self, value: Value) -> Result<(), EvalError> {
        let Some(Entry::Op { slots, .. }) = self.stack.last_mut() else {
            return Err(internal("value with no operation below it"));
        };
        let slot = slots
            .iter_mut()
            .find(|s| matches!(s, Slot::Pending(_)))
            .ok_or_else(|| internal("value with no pending slot below it"))?;
        *slot = Slot::Ready(Arg::Value(value));
        Ok(())
    }

    fn snapshot(&self, failing: Option<&OpKey>) -> Box<EvalSnapshot> {
        let mut stack: Vec<String> = self.stack.iter().map(ToString::to_string).collect();
        if let Some(key) = failing {
            stack.push(key.to_string());
        }
        Box::new(EvalSnapshot::new(stack, self.env.bindings()))
    }
}

impl<'a> EachFrame<'a> {
    fn snapshot(&self) -> Box<EvalSnapshot> {
        let stack = vec![format!("{} {}", self.mode, Value::from(self.callee.clone()))];
        Box::new(EvalSnapshot::new(stack, self.env.bindings()))
    }

    fn absorb(&mut self, result: Value) -> Result<(), EvalError> {
        match self.mode {
            EachMode::Map => self.out.push(result),
            EachMode::Filter => {
                let item = self.current.take().ok_or_else(|| internal("filter without element"))?;
                if result.is_truthy(self.shared.object) {
                    self.out.push(item);
                }
            }
            EachMode::FlatMap => match result {
                Value::List(items) => self.out.extend(items),
                other => {
                    return Err(EvalError::Operator {
                        name: self.mode.to_string(),
                        source: OpError::invalid("flatMap function must return a list", vec![other]),
                        snapshot: self.snapshot(),
                    });
                }
            },
        }
        Ok(())
    }
}

impl<'a> Receive<Value, EvalError> for Frame<'a> {
    fn receive(self, value: Value) -> Result<Self, EvalError> {
        match self {
            Frame::Eval(mut f) => {
                f.stack.push(Entry::Value(value));
                Ok(Frame::Eval(f))
            }
            Frame::Each(_) | Frame::Keys(_) => Err(internal("frame cannot absorb a result")),
        }
    }
}

fn continuation_task<'a>(
    shared: Shared<'a>,
    env: &Environment,
    continuation: Continuation,
) -> Result<EvalTask<'a>, EvalError> {
    let task = match continuation {
        Continuation::Force(thunk) => {
            let (operand, env) = thunk.into_parts();
            Task::new(eval_step, Frame::Eval(EvalFrame::start(shared, env, &operand)?))
        }
        Continuation::Each {
            items,
            callee,
            mode,
        } => Task::new(
            each_step,
            Frame::Each(EachFrame {
                shared,
                env: env.clone(),
                callee,
                mode,
                items: items.into_iter(),
                current: None,
                out: Vec::new(),
            }),
        ),
        Continuation::Keys => Task::new(
            keys_step,
            Frame::Keys(KeysFrame {
                keys: shared.object.keys().into_iter(),
                out: Vec::new(),
            }),
        ),
    };
    Ok(task)
}

/// One evaluator action: fill a slot, descend into a pending operand, or
/// apply a fully resolved operator.
fn eval_step(frame: Frame<'_>) -> Result<EvalStep<'_>, EvalError> {
    let Frame::Eval(mut f) = frame else {
        return Err(internal("eval step on a non-eval frame"));
    };
    match f.stack.pop() {
        None => Err(internal("empty evaluation stack")),
        Some(Entry::Value(v)) => {
            if f.stack.is_empty() {
                return Ok(Step::Done(v));
            }
            f.fill(v)?;
            Ok(Step::Continue(Frame::Eval(f)))
        }
        Some(Entry::Op { key, slots }) => {
            let pending = slots.iter().find_map(|s| match s {
                Slot::Pending(id) => Some(*id),
                Slot::Ready(_) => None,
            });
            if let Some(id) = pending {
                f.stack.push(Entry::Op { key, slots });
                f.push_node(id)?;
                return Ok(Step::Continue(Frame::Eval(f)));
            }
            apply(f, key, slots)
        }
    }
}

fn apply<'a>(mut f: EvalFrame<'a>, key: OpKey, slots: Vec<Slot>) -> Result<EvalStep<'a>, EvalError> {
    let mut args = Vec::with_capacity(slots.len());
    for slot in slots {
        match slot {
            Slot::Ready(arg) => args.push(arg),
            Slot::Pending(_) => return Err(internal("applying an operator with pending operands")),
        }
    }
    let Some(def) = f.shared.registry.get(&key) else {
        return Err(EvalError::UnknownOperator {
            name: key.name().to_owned(),
            arity: key.arity(),
            snapshot: f.snapshot(Some(&key)),
        });
    };
    let outcome = def.call(&Scope::new(f.shared.object, &f.env, f.shared.registry), args);
    match outcome {
        Ok(Outcome::Value(v)) => {
            f.stack.push(Entry::Value(v));
            Ok(Step::Continue(Frame::Eval(f)))
        }
        Ok(Outcome::Call(c)) => {
            let task = continuation_task(f.shared, &f.env, c)?;
            Ok(Step::Call {
                state: Frame::Eval(f),
                task,
            })
        }
        Err(source) => Err(EvalError::Operator {
            name: key.name().to_owned(),
            source,
            snapshot: f.snapshot(Some(&key)),
        }),
    }
}

fn each_step(frame: Frame<'_>) -> Result<EvalStep<'_>, EvalError> {
    let Frame::Each(mut f) = frame else {
        return Err(internal("each step on a non-each frame"));
    };
    let Some(item) = f.items.next() else {
        return Ok(Step::Done(Value::List(std::mem::take(&mut f.out))));
    };
    let outcome = f.callee.apply(
        &Scope::new(f.shared.object, &f.env, f.shared.registry),
        vec![item.clone()],
    );
    f.current = Some(item);
    match outcome {
        Ok(Outcome::Value(v)) => {
            f.absorb(v)?;
            Ok(Step::Continue(Frame::Each(f)))
        }
        Ok(Outcome::Call(c)) => {
            let task = continuation_task(f.shared, &f.env, c)?.with_receiver(collect_each);
            Ok(Step::Call {
                state: Frame::Each(f),
                task,
            })
        }
        Err(source) => Err(EvalError::Operator {
            name: f.mode.to_string(),
            source,
            snapshot: f.snapshot(),
        }),
    }
}

/// Receiver for per-element results of `map`, `filter` and `flatMap`.
fn collect_each(frame: Frame<'_>, value: Value) -> Result<Frame<'_>, EvalError> {
    let Frame::Each(mut f) = frame else {
        return Err(internal("element result delivered to a non-each frame"));
    };
    f.absorb(value)?;
    Ok(Frame::Each(f))
}

fn keys_step(frame: Frame<'_>) -> Result<EvalStep<'_>, EvalError> {
    let Frame::Keys(mut f) = frame else {
        return Err(internal("keys step on a non-keys frame"));
    };
    match f.keys.next() {
        Some(key) => {
            f.out.push(Value::Str(key));
            Ok(Step::Continue(Frame::Keys(f)))
        }
        None => Ok(Step::Done(Value::List(f.out))),
    }
}

/// Evaluate `root` in `env` against `shared.object`. The counters cover the
/// steps taken even when evaluation fails.
pub(crate) fn evaluate(
    shared: Shared<'_>,
    env: Environment,
    root: &Operand,
    scheduler: Scheduler,
) -> (Result<Value, EvalError>, RunStats) {
    match EvalFrame::start(shared, env, root) {
        Ok(frame) => scheduler.run_many_counted(vec![Task::new(eval_step, Frame::Eval(frame))]),
        Err(e) => (Err(e), RunStats::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{parse, tokenize};
    use crate::{builtins, Record};

    fn eval_in(object: &Record, env: Environment, text: &str) -> Result<Value, EvalError> {
        let registry = builtins::standard();
        let tokens = tokenize(&registry, text).unwrap();
        let (root, pool) = parse(&registry, tokens, 10_000).unwrap();
        let shared = Shared {
            object,
            registry: &registry,
            pool: &pool,
        };
        evaluate(shared, env, &root, Scheduler::default()).0
    }

    fn eval(object: &Record, text: &str) -> Result<Value, EvalError> {
        eval_in(object, Environment::new(), text)
    }

    #[test]
    fn literal_root() {
        assert_eq!(eval(&Record::new(), "'x'"), Ok(Value::from("x")));
    }

    #[test]
    fn nested_operators() {
        let obj = Record::new();
        assert_eq!(
            eval(&obj, "!('true' == 'false') == !!'true'"),
            Ok(Value::Bool(true))
        );
    }

    #[test]
    fn bare_block_root_fails() {
        assert_eq!(eval(&Record::new(), "{'a'}"), Err(EvalError::BareBlock));
    }

    #[test]
    fn environment_reaches_variables() {
        let env = Environment::new().with("x", "hello".into());
        assert_eq!(eval_in(&Record::new(), env, "v'x'"), Ok(Value::from("hello")));
    }

    #[test]
    fn operator_error_captures_snapshot() {
        let obj = Record::new();
        let env = Environment::new().with("k", "absent".into());
        let err = eval_in(&obj, env, "'a' ^ *v'k'").unwrap_err();
        assert_eq!(err.to_string(), "Can't dereference given key: 'absent'");
        let snapshot = err.snapshot().unwrap();
        assert_eq!(snapshot.stack().last().map(String::as_str), Some("*#1"));
        assert_eq!(snapshot.stack().first().map(String::as_str), Some("^('a', #1)"));
        assert_eq!(snapshot.env(), &[("k".to_owned(), Value::from("absent"))]);
    }

    #[test]
    fn keys_frame_lists_host_keys() {
        let obj = Record::new().set("b", "1").set("a", "2");
        assert_eq!(eval(&obj, "$'KEYS'"), Ok(Value::from(vec!["a", "b"])));
    }

    #[test]
    fn map_over_sub_expression() {
        let obj = Record::new().set("a", "x").set("b", "y");
        assert_eq!(
            eval(&obj, "$'KEYS' map ('k' => { *v'k' })"),
            Ok(Value::from(vec!["x", "y"]))
        );
    }

    #[test]
    fn filter_keeps_truthy_elements() {
        let obj = Record::new().set("name1", "Tim").set("car", "a car");
        assert_eq!(
            eval(&obj, "$'KEYS' filter ('StartsWith' bind 'name')"),
            Ok(Value::from(vec!["name1"]))
        );
    }

    #[test]
    fn flat_map_splices_lists() {
        let obj = Record::new()
            .set("xs", vec!["a", "b"])
            .set("ys", vec!["c"])
            .set("keys", vec!["xs", "ys"]);
        assert_eq!(
            eval(&obj, "*'keys' flatMap ('k' => { *v'k' })"),
            Ok(Value::from(vec!["a", "b", "c"]))
        );
    }

    #[test]
    fn flat_map_rejects_non_list_results() {
        let obj = Record::new().set("keys", vec!["a"]).set("a", "x");
        let err = eval(&obj, "*'keys' flatMap ('k' => { *v'k' })").unwrap_err();
        assert!(err.to_string().starts_with("flatMap function must return a list"));
    }

    #[test]
    fn step_budget_exceeded() {
        let registry = builtins::standard();
        let tokens = tokenize(&registry, "'a' ^ 'b' ^ 'c'").unwrap();
        let (root, pool) = parse(&registry, tokens, 1_000).unwrap();
        let obj = Record::new();
        let shared = Shared {
            object: &obj,
            registry: &registry,
            pool: &pool,
        };
        let (result, stats) = evaluate(shared, Environment::new(), &root, Scheduler::new(4, 3));
        assert_eq!(result, Err(EvalError::BudgetExceeded { budget: 3 }));
        assert_eq!(stats.steps, 3);
    }
}
