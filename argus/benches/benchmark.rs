use argus::decorate::check_args;
use argus::parser;
use argus::registry::Registry;
use argus::value::Value;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lazy_static::lazy_static;

lazy_static! {
    static ref WIDE_ALT: String = {
        let names = (0..32).map(|i| format!("t{i}")).collect::<Vec<_>>().join("/");
        format!("wide.dispatch( v ) ==> boolean\nv : {names}")
    };
    static ref VARARG_SIG: String = String::from(
        "stream.push( [string [, userdata] [, boolean],] [number,] ... )\n\
         ... : ((table, string/number) / boolean)*"
    );
    static ref OVERLAP_SIG: String =
        String::from("mix.pick( number, [table,] mytable ) ==> (table, boolean) / (mytable, number)");
}

fn wide_registry() -> Registry {
    let mut registry = Registry::new();
    for i in 0..32 {
        let tag = format!("wide{i}");
        registry
            .register(&format!("t{i}"), move |v: &Value| {
                matches!(v, Value::Userdata(u) if u.tag() == tag)
            })
            .unwrap();
    }
    registry
}

fn overlap_registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .register("mytable", |v| {
            matches!(v.field("is_mytable"), Some(Value::Boolean(true)))
        })
        .unwrap();
    registry
}

pub fn parse(c: &mut Criterion) {
    c.bench_function("parse vararg signature", |b| {
        b.iter(|| parser::signature(black_box(&VARARG_SIG)).unwrap())
    });
    c.bench_function("parse wide alternation", |b| {
        b.iter(|| parser::signature(black_box(&WIDE_ALT)).unwrap())
    });
}

pub fn compile(c: &mut Criterion) {
    let registry = wide_registry();
    c.bench_function("compile wide alternation", |b| {
        b.iter(|| check_args(black_box(&WIDE_ALT), &registry).unwrap())
    });
    let registry = Registry::new();
    c.bench_function("compile vararg signature", |b| {
        b.iter(|| check_args(black_box(&VARARG_SIG), &registry).unwrap())
    });
}

pub fn check_linear(c: &mut Criterion) {
    let registry = Registry::new();
    let checker = check_args(&VARARG_SIG, &registry).unwrap();
    let mut values = vec![
        Value::from("head"),
        Value::userdata("file"),
        Value::from(true),
        Value::from(1),
    ];
    for i in 0..64 {
        values.push(Value::table());
        values.push(Value::from(i));
    }
    c.bench_function("linear check, 132 values", |b| {
        b.iter(|| checker.check(black_box(&values)).unwrap())
    });
}

pub fn check_backtracking(c: &mut Criterion) {
    let registry = overlap_registry();
    let checker = check_args(&OVERLAP_SIG, &registry).unwrap();
    assert!(checker.dfa().needs_backtracking());
    let accepted = vec![
        Value::from(1),
        Value::table_from([("is_mytable", Value::from(true))]),
    ];
    let rejected = vec![
        Value::from(1),
        Value::table_from([("is_mytable", Value::from(true))]),
        Value::table(),
    ];
    c.bench_function("backtracking check, accept", |b| {
        b.iter(|| checker.check(black_box(&accepted)).unwrap())
    });
    c.bench_function("backtracking check, reject", |b| {
        b.iter(|| checker.check(black_box(&rejected)).unwrap_err())
    });
}

criterion_group!(benches, parse, compile, check_linear, check_backtracking);
criterion_main!(benches);
