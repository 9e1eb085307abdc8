//! Reverse queries select exactly the same pairs of objects as the query
//! they were derived from.
//!
//! Each query is evaluated over a small grid of rows with a tiny
//! interpreter: once from the declaring side (`this` is the order) and
//! once, reversed, from the related side (`this` is the customer).

use objmeta::dsl::{self, reverse, AttributeRef, Expr, Literal, Operand, Owner, RelOp};
use std::cmp::Ordering;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, PartialOrd)]
enum Value {
    Int(i64),
    Str(String),
}

type Row = HashMap<&'static str, Value>;

fn row(values: &[(&'static str, Value)]) -> Row {
    values.iter().cloned().collect()
}

fn int(v: i64) -> Value {
    Value::Int(v)
}

fn text(v: &str) -> Value {
    Value::Str(v.to_string())
}

// ============================================================================
// Interpreter
// ============================================================================

struct Scope<'a> {
    this: &'a Row,
    types: HashMap<&'static str, &'a Row>,
}

impl Scope<'_> {
    fn lookup(&self, r: &AttributeRef) -> Option<Value> {
        let row = match &r.owner {
            Owner::This => self.this,
            Owner::Type(t) => self.types[t.as_str()],
        };
        row.get(r.attribute.as_str()).cloned()
    }

    fn literal(&self, l: &Literal) -> Value {
        match l {
            Literal::String(s) => Value::Str(s.clone()),
            Literal::Number(n) => Value::Int(n.parse().unwrap()),
            Literal::Boolean(b) => Value::Int(*b as i64),
            Literal::Param(p) => panic!("unbound parameter {p}"),
        }
    }

    fn operand(&self, o: &Operand) -> Option<Value> {
        match o {
            Operand::Attribute(r) => self.lookup(r),
            Operand::Literal(l) => Some(self.literal(l)),
        }
    }

    fn eval(&self, expr: &Expr) -> bool {
        match expr {
            Expr::Compare { left, op, right } => {
                let (Some(l), Some(r)) = (self.operand(&left.value), self.operand(&right.value)) else {
                    return false;
                };
                let Some(ord) = l.partial_cmp(&r) else {
                    return false;
                };
                match op {
                    RelOp::Eq => ord == Ordering::Equal,
                    RelOp::NotEq => ord != Ordering::Equal,
                    RelOp::Lt => ord == Ordering::Less,
                    RelOp::Gt => ord == Ordering::Greater,
                    RelOp::LtEq => ord != Ordering::Greater,
                    RelOp::GtEq => ord != Ordering::Less,
                }
            }
            Expr::In {
                attribute,
                negated,
                values,
            } => match self.lookup(&attribute.value) {
                Some(v) => values.iter().any(|l| self.literal(&l.value) == v) != *negated,
                None => false,
            },
            Expr::IsNull { attribute, negated } => self.lookup(&attribute.value).is_none() != *negated,
            Expr::EqualsEdgePoint { attribute } => self.lookup(&attribute.value) == Some(text("edge")),
            Expr::And(items) => items.iter().all(|i| self.eval(&i.value)),
            Expr::Or(items) => items.iter().any(|i| self.eval(&i.value)),
        }
    }
}

// ============================================================================
// Fixtures
// ============================================================================

fn orders() -> Vec<Row> {
    vec![
        row(&[("id", int(1)), ("customerId", int(10)), ("total", int(500)), ("regionId", int(1))]),
        row(&[("id", int(2)), ("customerId", int(20)), ("total", int(50)), ("regionId", int(2))]),
        row(&[("id", int(3)), ("total", int(5000)), ("regionId", int(3))]),
        row(&[("id", int(4)), ("customerId", int(30)), ("total", int(0)), ("regionId", int(1))]),
    ]
}

fn customers() -> Vec<Row> {
    vec![
        row(&[
            ("id", int(10)),
            ("status", text("ACTIVE")),
            ("creditLimit", int(1000)),
            ("vip", int(0)),
            ("tier", int(1)),
            ("businessDate", text("edge")),
        ]),
        row(&[
            ("id", int(20)),
            ("status", text("CLOSED")),
            ("creditLimit", int(10)),
            ("vip", int(1)),
            ("tier", int(3)),
            ("closedAt", int(20240101)),
            ("businessDate", text("2024-01-01")),
        ]),
        row(&[("id", int(30)), ("status", text("ACTIVE")), ("tier", int(7))]),
    ]
}

fn regions() -> Vec<Row> {
    vec![
        row(&[("id", int(1)), ("code", text("EU"))]),
        row(&[("id", int(2)), ("code", text("US"))]),
        row(&[("id", int(3)), ("code", text("APAC"))]),
    ]
}

const QUERIES: &[&str] = &[
    "this.customerId = Customer.id",
    r#"this.customerId = Customer.id and Customer.status = "ACTIVE""#,
    "this.total > Customer.creditLimit or Customer.vip = true",
    r#"Customer.id = this.customerId and this.regionId = Region.id and Region.code in ("EU", "US")"#,
    "this.customerId = Customer.id and Customer.closedAt is null",
    "this.customerId = Customer.id and Customer.tier not in (1, 2)",
    "5 <= Customer.tier and this.customerId != Customer.id",
    "this.customerId = Customer.id and (this.total >= 100 or Customer.closedAt is not null)",
    "this.customerId = Customer.id and Customer.businessDate equalsEdgePoint",
];

fn parse(query: &str) -> Expr {
    let result = dsl::parse(query);
    assert!(result.is_ok(), "{query}: {:?}", result.diagnostics);
    result.query.unwrap().value
}

// ============================================================================
// Properties
// ============================================================================

#[test]
fn test_reverse_selects_same_pairs() {
    let (orders, customers, regions) = (orders(), customers(), regions());

    for query in QUERIES {
        let forward = parse(query);
        let reversed = parse(&reverse::reverse_text(&forward, "Order", "Customer"));

        let mut matched = 0;
        for order in &orders {
            for customer in &customers {
                for region in &regions {
                    let from_order = Scope {
                        this: order,
                        types: HashMap::from([("Customer", customer), ("Region", region)]),
                    };
                    let from_customer = Scope {
                        this: customer,
                        types: HashMap::from([("Order", order), ("Region", region)]),
                    };
                    let expected = from_order.eval(&forward);
                    assert_eq!(
                        expected,
                        from_customer.eval(&reversed),
                        "{query} disagrees on order {:?} / customer {:?}",
                        order.get("id"),
                        customer.get("id")
                    );
                    matched += expected as usize;
                }
            }
        }
        assert!(matched > 0, "{query} matched nothing; the grid does not exercise it");
    }
}

#[test]
fn test_reverse_text_reparses_to_swapped_tree() {
    for query in QUERIES {
        let forward = parse(query);
        let swapped = reverse::swap_roles(&forward, "Order", "Customer");
        let reparsed = parse(&reverse::reverse_text(&forward, "Order", "Customer"));
        assert_eq!(swapped.to_string(), reparsed.to_string(), "{query}");
    }
}

#[test]
fn test_reverse_twice_is_identity() {
    for query in QUERIES {
        let forward = parse(query);
        let there = reverse::swap_roles(&forward, "Order", "Customer");
        let back = reverse::swap_roles(&there, "Customer", "Order");
        assert_eq!(back.to_string(), forward.to_string(), "{query}");
    }
}
