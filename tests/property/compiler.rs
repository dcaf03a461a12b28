use calcdag::compiler::{CompileError, Operator, compile};
use calcdag::dag::TaskFailure;
use calcdag::engine::{DispatchSettings, Dispatcher};
use calcdag::registry::ExpressionStatus;
use calcdag_test_utils::drive_to_completion;
use proptest::prelude::*;

#[derive(Debug, Clone)]
pub enum Expr {
    Num(u8),
    Bin(Box<Expr>, Operator, Box<Expr>),
}

impl Expr {
    /// Fully parenthesised rendering, so the compiled graph mirrors the tree.
    pub fn render(&self) -> String {
        match self {
            Expr::Num(n) => n.to_string(),
            Expr::Bin(l, op, r) => format!("({} {} {})", l.render(), op, r.render()),
        }
    }

    pub fn eval(&self) -> Result<f64, TaskFailure> {
        match self {
            Expr::Num(n) => Ok(f64::from(*n)),
            Expr::Bin(l, op, r) => apply(*op, l.eval()?, r.eval()?),
        }
    }

    fn operators(&self) -> usize {
        match self {
            Expr::Num(_) => 0,
            Expr::Bin(l, _, r) => 1 + l.operators() + r.operators(),
        }
    }
}

fn apply(op: Operator, a: f64, b: f64) -> Result<f64, TaskFailure> {
    match op {
        Operator::Add => Ok(a + b),
        Operator::Subtract => Ok(a - b),
        Operator::Multiply => Ok(a * b),
        Operator::Divide if b == 0.0 => Err(TaskFailure::DivisionByZero),
        Operator::Divide => Ok(a / b),
    }
}

fn operator() -> impl Strategy<Value = Operator> {
    prop_oneof![
        Just(Operator::Add),
        Just(Operator::Subtract),
        Just(Operator::Multiply),
        Just(Operator::Divide),
    ]
}

pub fn expr_tree() -> impl Strategy<Value = Expr> {
    let leaf = (0u8..10).prop_map(Expr::Num);
    leaf.prop_recursive(4, 24, 2, |inner| {
        (inner.clone(), operator(), inner)
            .prop_map(|(l, op, r)| Expr::Bin(Box::new(l), op, Box::new(r)))
    })
}

/// Evaluate a flat `n0 op n1 op n2 ...` with `*`/`/` binding tighter and
/// left associativity, applying operations in the same order as the
/// compiler emits them.
fn eval_flat(first: u8, rest: &[(Operator, u8)]) -> Result<f64, TaskFailure> {
    let mut terms = vec![f64::from(first)];
    let mut additive = Vec::new();
    for &(op, n) in rest {
        let n = f64::from(n);
        match op {
            Operator::Multiply | Operator::Divide => {
                let last = terms.pop().unwrap_or_default();
                terms.push(apply(op, last, n)?);
            }
            Operator::Add | Operator::Subtract => {
                additive.push(op);
                terms.push(n);
            }
        }
    }
    let mut terms = terms.into_iter();
    let mut acc = terms.next().unwrap_or_default();
    for (op, term) in additive.into_iter().zip(terms) {
        acc = apply(op, acc, term)?;
    }
    Ok(acc)
}

fn run(input: &str) -> (ExpressionStatus, Option<f64>, Option<TaskFailure>) {
    let dispatcher = Dispatcher::new(DispatchSettings::default());
    let id = dispatcher.submit(input).unwrap();
    drive_to_completion(&dispatcher);
    let node = dispatcher.lookup(&id).unwrap();
    (node.status, node.result, node.error)
}

pub fn expected(value: Result<f64, TaskFailure>) -> (ExpressionStatus, Option<f64>, Option<TaskFailure>) {
    match value {
        Ok(v) => (ExpressionStatus::Done, Some(v), None),
        Err(reason) => (ExpressionStatus::Failed, None, Some(reason)),
    }
}

proptest! {
    #[test]
    fn tree_result_matches_reference(expr in expr_tree()) {
        prop_assert_eq!(run(&expr.render()), expected(expr.eval()));
    }

    #[test]
    fn one_task_per_operator(expr in expr_tree()) {
        let compiled = compile(&expr.render()).unwrap();
        prop_assert_eq!(compiled.task_count(), expr.operators());
    }

    #[test]
    fn flat_result_follows_precedence(
        first in 0u8..10,
        rest in proptest::collection::vec((operator(), 0u8..10), 0..8),
    ) {
        let mut input = first.to_string();
        for (op, n) in &rest {
            input.push_str(&format!(" {op} {n}"));
        }
        prop_assert_eq!(run(&input), expected(eval_flat(first, &rest)));
    }

    #[test]
    fn dropping_a_closing_paren_is_mismatched(expr in expr_tree(), pick in any::<prop::sample::Index>()) {
        let rendered = expr.render();
        let closing: Vec<usize> = rendered.match_indices(')').map(|(i, _)| i).collect();
        prop_assume!(!closing.is_empty());

        let mut broken = rendered.clone();
        broken.remove(closing[pick.index(closing.len())]);

        let dispatcher = Dispatcher::new(DispatchSettings::default());
        let result = dispatcher.submit(&broken);
        prop_assert!(
            matches!(result, Err(CompileError::MismatchedParentheses { .. })),
            "{} gave {:?}", broken, result
        );
        prop_assert!(dispatcher.list_expressions().is_empty());
        prop_assert_eq!(dispatcher.store().task_count(), 0);
    }
}
