/*!
 * Task Kill Hot Path Benchmark
 * Cost of the hold hook per delivery attempt, forwarded and intercepted
 */

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use prochold::hold::{ProtectedPidRegistry, ProtectionController, SignalClassifier};
use prochold::kernel::{KernelHost, SigInfo, SigInfoRef, SimulatedKernel};
use prochold::signals::SignalDeliveryEvent;
use std::sync::Arc;

const HELD: i32 = 500;

fn benchmark_classifier(c: &mut Criterion) {
    let registry = ProtectedPidRegistry::new();
    registry.claim(HELD).unwrap();
    let intercepted = SignalDeliveryEvent::queued(HELD, 15, 999);
    let forwarded = SignalDeliveryEvent::direct(HELD, 15, 999);

    let mut group = c.benchmark_group("classifier");
    group.bench_function("intercept", |b| {
        b.iter(|| SignalClassifier::should_intercept(black_box(&intercepted), &registry))
    });
    group.bench_function("forward", |b| {
        b.iter(|| SignalClassifier::should_intercept(black_box(&forwarded), &registry))
    });
    group.finish();
}

fn benchmark_task_kill(c: &mut Criterion) {
    let kernel = Arc::new(SimulatedKernel::legacy());
    let task = kernel.spawn(HELD).unwrap();
    let mut controller = ProtectionController::new(kernel.clone());
    controller.start().unwrap();
    controller.hold(HELD).unwrap();

    let slot = &kernel.security_ops().unwrap().task_kill;
    let queued = SigInfoRef::Info(SigInfo::queued(15, 999));
    let user = SigInfoRef::Info(SigInfo::user(15, 999));

    let mut group = c.benchmark_group("task_kill");
    group.bench_function("intercepted", |b| {
        b.iter(|| black_box(slot.call(&task, black_box(&queued), 15)))
    });
    group.bench_function("forwarded", |b| {
        b.iter(|| black_box(slot.call(&task, black_box(&user), 15)))
    });
    group.finish();

    controller.finish().unwrap();
}

criterion_group!(benches, benchmark_classifier, benchmark_task_kill);
criterion_main!(benches);
