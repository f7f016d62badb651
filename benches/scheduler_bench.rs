use std::fmt::Write;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use gale::foreign::ForeignBridge;
use gale::runtime::{FrontierOrder, Outcome, Scheduler, SchedulerOptions};
use gale::syntax::program::Program;
use gale::syntax::{lexer::Lexer, parser::Parser};

struct Scenario {
    name: &'static str,
    source: String,
    n: u64,
}

fn parse_program(source: &str) -> Program {
    let lexer = Lexer::new(source);
    let mut parser = Parser::new(lexer);
    let program = parser.parse_program();
    assert!(parser.errors.is_empty(), "corpus must parse cleanly");
    program
}

fn run_program(program: &Program, order: FrontierOrder) {
    let options = SchedulerOptions {
        order,
        ..SchedulerOptions::default()
    };
    let mut scheduler = Scheduler::new(ForeignBridge::new(), options);
    scheduler.load_program(program);
    let evaluation = scheduler.run();
    assert!(matches!(evaluation.outcome, Outcome::Value(_)));
    black_box(evaluation.steps);
}

fn build_chain_program(n: usize) -> String {
    let mut src = String::with_capacity(32 * n + 64);
    let _ = writeln!(src, "fun id(x) {{ x }}");
    let _ = writeln!(src, "v_0 = id(0)");
    for i in 1..n {
        let _ = writeln!(src, "v_{i} = id(v_{})", i - 1);
    }
    let _ = writeln!(src, "v_{}", n - 1);
    src
}

fn build_wide_program(n: usize) -> String {
    let mut src = String::with_capacity(32 * n + 64);
    let _ = writeln!(src, "fun id(x) {{ x }}");
    for i in 0..n {
        let _ = writeln!(src, "w_{i} = id({i})");
    }
    let _ = writeln!(src, "w_{}", n - 1);
    src
}

fn build_forward_program(n: usize) -> String {
    let mut src = String::with_capacity(32 * n + 64);
    let _ = writeln!(src, "fun id(x) {{ x }}");
    for i in 0..n - 1 {
        let _ = writeln!(src, "f_{i} = id(f_{})", i + 1);
    }
    let _ = writeln!(src, "f_{} = id(0)", n - 1);
    let _ = writeln!(src, "f_0");
    src
}

fn build_unlinked_calls_program(n: usize) -> String {
    let mut src = String::with_capacity(32 * n + 64);
    let _ = writeln!(src, "use calc.add");
    let _ = writeln!(src, "t_0 = add(0, 1)");
    for i in 1..n {
        let _ = writeln!(src, "t_{i} = add(t_{}, {i})", i - 1);
    }
    let _ = writeln!(src, "t_{}", n - 1);
    src
}

fn build_scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "chain_1k",
            source: build_chain_program(1_000),
            n: 1_000,
        },
        Scenario {
            name: "wide_1k",
            source: build_wide_program(1_000),
            n: 1_000,
        },
        Scenario {
            name: "forward_1k",
            source: build_forward_program(1_000),
            n: 1_000,
        },
        Scenario {
            name: "foreign_unlinked_1k",
            source: build_unlinked_calls_program(1_000),
            n: 1_000,
        },
    ]
}

fn bench_scheduler_evaluate(c: &mut Criterion) {
    let scenarios = build_scenarios();
    let mut group = c.benchmark_group("scheduler/evaluate");

    for scenario in scenarios {
        let program = parse_program(&scenario.source);
        group.throughput(Throughput::Elements(scenario.n));
        group.bench_with_input(
            BenchmarkId::from_parameter(scenario.name),
            &program,
            |b, program| {
                b.iter(|| {
                    run_program(black_box(program), FrontierOrder::Fifo);
                });
            },
        );
    }

    group.finish();
}

fn bench_frontier_orders(c: &mut Criterion) {
    let program = parse_program(&build_chain_program(1_000));
    let orders = [
        ("fifo", FrontierOrder::Fifo),
        ("lifo", FrontierOrder::Lifo),
        ("seeded", FrontierOrder::Seeded(0x9e3779b97f4a7c15)),
    ];
    let mut group = c.benchmark_group("scheduler/frontier_order");

    for (name, order) in orders {
        group.throughput(Throughput::Elements(1_000));
        group.bench_with_input(BenchmarkId::from_parameter(name), &program, |b, program| {
            b.iter(|| {
                run_program(black_box(program), order);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_scheduler_evaluate, bench_frontier_orders);
criterion_main!(benches);
