//! Setup and cycle throughput for a 12-stage processing chain.

use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use serde::Serialize;

use lockstep::config::{ModuleSetup, ScheduleConfig};
use lockstep::data::DataType;
use lockstep::factory::{ModuleFactory, ModuleRegistry};
use lockstep::hardware::{null_hardware, SystemClock};
use lockstep::module::{Module, ModuleError};
use lockstep::scheduler::Scheduler;
use lockstep::store::{DependencyHandle, ProductionHandle};
use lockstep::type_registry::TypeRegistry;
use lockstep::types::{DataKind, GroupKind};

const BRAIN: GroupKind = GroupKind::new("brain");

macro_rules! stage_type {
    ($name:ident) => {
        #[derive(Clone, Default, Serialize)]
        struct $name(f32);
        impl DataType for $name {
            const KIND: DataKind = DataKind::new(stringify!($name));
        }
    };
}

stage_type!(Stage0);
stage_type!(Stage1);
stage_type!(Stage2);
stage_type!(Stage3);
stage_type!(Stage4);
stage_type!(Stage5);
stage_type!(Stage6);
stage_type!(Stage7);
stage_type!(Stage8);
stage_type!(Stage9);
stage_type!(Stage10);
stage_type!(Stage11);

struct Source {
    out: ProductionHandle<Stage0>,
}
impl Module for Source {
    fn cycle(&mut self) -> Result<(), ModuleError> {
        self.out.set(Stage0(1.0));
        Ok(())
    }
}

struct Relay<D: DataType, P: DataType> {
    input: DependencyHandle<D>,
    out: ProductionHandle<P>,
}
impl<D: DataType, P: DataType> Module for Relay<D, P> {
    fn cycle(&mut self) -> Result<(), ModuleError> {
        let _ = self.input.fresh();
        self.out.set(P::default());
        Ok(())
    }
}

fn chain_registry() -> (Arc<TypeRegistry>, ModuleRegistry, ScheduleConfig) {
    let mut builder = TypeRegistry::builder();
    builder
        .register::<Stage0>()
        .register::<Stage1>()
        .register::<Stage2>()
        .register::<Stage3>()
        .register::<Stage4>()
        .register::<Stage5>()
        .register::<Stage6>()
        .register::<Stage7>()
        .register::<Stage8>()
        .register::<Stage9>()
        .register::<Stage10>()
        .register::<Stage11>();
    let types = Arc::new(builder.build().unwrap());

    let mut registry = ModuleRegistry::new();
    registry.register_factory(
        BRAIN,
        ModuleFactory::new("Stage0Provider", |ctx| {
            Ok(Box::new(Source {
                out: ctx.produce()?,
            }) as Box<dyn Module>)
        }),
    );

    macro_rules! relay {
        ($name:expr, $dep:ty, $out:ty) => {
            registry.register_factory(
                BRAIN,
                ModuleFactory::new($name, |ctx| {
                    Ok(Box::new(Relay::<$dep, $out> {
                        input: ctx.depend()?,
                        out: ctx.produce()?,
                    }) as Box<dyn Module>)
                }),
            );
        };
    }
    relay!("Stage1Provider", Stage0, Stage1);
    relay!("Stage2Provider", Stage1, Stage2);
    relay!("Stage3Provider", Stage2, Stage3);
    relay!("Stage4Provider", Stage3, Stage4);
    relay!("Stage5Provider", Stage4, Stage5);
    relay!("Stage6Provider", Stage5, Stage6);
    relay!("Stage7Provider", Stage6, Stage7);
    relay!("Stage8Provider", Stage7, Stage8);
    relay!("Stage9Provider", Stage8, Stage9);
    relay!("Stage10Provider", Stage9, Stage10);
    relay!("Stage11Provider", Stage10, Stage11);

    let mut setup = ModuleSetup::new();
    setup.set("Stage0Provider", true);
    for i in 1..=11 {
        setup.set(format!("Stage{i}Provider"), true);
    }
    let config = ScheduleConfig::new().with_group(BRAIN, setup);

    (types, registry, config)
}

fn bench_setup(c: &mut Criterion) {
    let (types, registry, config) = chain_registry();
    c.bench_function("setup_12_module_chain", |b| {
        b.iter(|| {
            let scheduler = Scheduler::setup(
                BRAIN,
                &registry,
                &config,
                Arc::clone(&types),
                null_hardware(),
                Arc::new(SystemClock),
            )
            .unwrap();
            black_box(scheduler.execution_order().len())
        })
    });
}

fn bench_cycle(c: &mut Criterion) {
    let (types, registry, config) = chain_registry();
    let mut scheduler = Scheduler::setup(
        BRAIN,
        &registry,
        &config,
        types,
        null_hardware(),
        Arc::new(SystemClock),
    )
    .unwrap();
    c.bench_function("cycle_12_module_chain", |b| {
        b.iter(|| black_box(scheduler.run_cycle().unwrap().cycle))
    });
}

criterion_group!(benches, bench_setup, bench_cycle);
criterion_main!(benches);
