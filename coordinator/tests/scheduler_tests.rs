use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use common::{Assignment, TaskId, WorkerHandle};
use coordinator::Scheduler;

fn handle(i: usize) -> WorkerHandle {
    WorkerHandle::new(format!("/workers/w{i}"))
}

fn files(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("pg-{i}.txt")).collect()
}

/// Muchos workers piden a la vez: cada tarea sale exactamente una vez.
#[test]
fn pedidos_concurrentes_nunca_comparten_lease_vigente() {
    const WORKERS: usize = 16;
    const TASKS: usize = 10;

    let scheduler = Arc::new(Scheduler::new("/in", files(TASKS), 2, Duration::from_secs(60)));
    let barrier = Barrier::new(WORKERS);
    let now = Instant::now();

    let handed: Vec<Option<TaskId>> = thread::scope(|s| {
        let joins: Vec<_> = (0..WORKERS)
            .map(|i| {
                let scheduler = &scheduler;
                let barrier = &barrier;
                s.spawn(move || {
                    barrier.wait();
                    scheduler.ask_map_task_at(&handle(i), now).task().map(|t| t.task_id)
                })
            })
            .collect();
        joins.into_iter().map(|j| j.join().unwrap()).collect()
    });

    let ids: Vec<TaskId> = handed.iter().flatten().copied().collect();
    let unique: HashSet<TaskId> = ids.iter().copied().collect();
    assert_eq!(ids.len(), TASKS);
    assert_eq!(unique.len(), TASKS);
    assert_eq!(handed.iter().filter(|h| h.is_none()).count(), WORKERS - TASKS);
}

/// Workers que piden, completan y vuelven a pedir en paralelo hasta que no
/// queda nada: el job termina con cada tarea completada una sola vez.
#[test]
fn workers_concurrentes_terminan_todo_el_job() {
    const WORKERS: usize = 8;

    let scheduler = Arc::new(Scheduler::new("/in", files(25), 7, Duration::from_secs(60)));

    let completed: Vec<(Vec<TaskId>, Vec<TaskId>)> = thread::scope(|s| {
        let joins: Vec<_> = (0..WORKERS)
            .map(|i| {
                let scheduler = &scheduler;
                s.spawn(move || {
                    let me = handle(i);
                    let mut maps = Vec::new();
                    let mut reduces = Vec::new();

                    loop {
                        match scheduler.ask_map_task(&me) {
                            Assignment::Task(t) => {
                                scheduler.map_task_over(t.task_id, Some(&me));
                                maps.push(t.task_id);
                            }
                            Assignment::NoTaskNow => thread::yield_now(),
                            Assignment::PhaseComplete => break,
                        }
                    }
                    loop {
                        match scheduler.ask_reduce_task(&me) {
                            Assignment::Task(t) => {
                                assert_eq!(t.map_worker_handles.len(), 25);
                                scheduler.reduce_task_over(t.task_id, Some(&me));
                                reduces.push(t.task_id);
                            }
                            Assignment::NoTaskNow => thread::yield_now(),
                            Assignment::PhaseComplete => break,
                        }
                    }
                    (maps, reduces)
                })
            })
            .collect();
        joins.into_iter().map(|j| j.join().unwrap()).collect()
    });

    let mut maps: Vec<TaskId> = completed.iter().flat_map(|(m, _)| m.clone()).collect();
    let mut reduces: Vec<TaskId> = completed.iter().flat_map(|(_, r)| r.clone()).collect();
    maps.sort_unstable();
    reduces.sort_unstable();

    assert_eq!(maps, (0..25).collect::<Vec<_>>());
    assert_eq!(reduces, (0..7).collect::<Vec<_>>());
    assert!(scheduler.is_job_done());
    assert_eq!(scheduler.remaining(), (0, 0));
}

/// Reportes duplicados concurrentes cuentan una sola vez.
#[test]
fn reportes_duplicados_concurrentes_cuentan_una_vez() {
    let scheduler = Arc::new(Scheduler::new("/in", files(1), 1, Duration::from_secs(60)));
    scheduler.ask_map_task(&handle(0));

    let barrier = Barrier::new(8);
    thread::scope(|s| {
        for i in 0..8 {
            let scheduler = &scheduler;
            let barrier = &barrier;
            s.spawn(move || {
                barrier.wait();
                scheduler.map_task_over(0, Some(&handle(i)));
            });
        }
    });

    assert_eq!(scheduler.remaining(), (0, 1));
    let r = scheduler.ask_reduce_task(&handle(9)).task().unwrap();
    assert_eq!(r.map_worker_handles.len(), 1);
}

/// Un worker toma un map y desaparece: después del timeout lo recibe otro,
/// y sólo uno, aunque varios pregunten a la vez.
#[test]
fn lease_vencido_va_a_uno_solo_de_muchos_pedidos() {
    let scheduler = Arc::new(Scheduler::new("/in", files(1), 1, Duration::from_secs(10)));
    let t0 = Instant::now();
    assert!(scheduler.ask_map_task_at(&handle(0), t0).is_task());

    let later = t0 + Duration::from_secs(11);
    let barrier = Barrier::new(6);
    let winners: usize = thread::scope(|s| {
        let joins: Vec<_> = (1..=6)
            .map(|i| {
                let scheduler = &scheduler;
                let barrier = &barrier;
                s.spawn(move || {
                    barrier.wait();
                    scheduler.ask_map_task_at(&handle(i), later).is_task()
                })
            })
            .collect();
        joins.into_iter().map(|j| j.join().unwrap() as usize).sum()
    });

    assert_eq!(winners, 1);
}
