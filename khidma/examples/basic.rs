//! Basic example of the Khidma DI container.
//!
//! Run with `RUST_LOG=khidma=debug` to see registration and resolution.

use khidma::prelude::*;
use parking_lot::Mutex;
use std::sync::Arc;

// === Contracts ===

trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

trait Inventory: Send + Sync {
    fn add(&self, item: &str);
    fn items(&self) -> Vec<String>;
}

// === Implementations ===

#[service(dyn Clock, Singleton, eager)]
#[derive(Default, Injectable)]
struct FrameClock;

impl Clock for FrameClock {
    fn now(&self) -> u64 {
        60
    }
}

/// One inventory per loaded scene.
#[service(dyn Inventory, Scoped)]
#[derive(Default, Injectable)]
#[injectable(entry = "inject")]
struct SceneInventory {
    items: Mutex<Vec<String>>,
    logger: Option<Arc<dyn Logger>>,
}

impl SceneInventory {
    fn inject(&mut self, logger: Arc<dyn Logger>) {
        self.logger = Some(logger);
    }
}

impl Inventory for SceneInventory {
    fn add(&self, item: &str) {
        if let Some(logger) = &self.logger {
            logger.log(&format!("picked up {item}"));
        }
        self.items.lock().push(item.to_owned());
    }

    fn items(&self) -> Vec<String> {
        self.items.lock().clone()
    }
}

// === A host-created object ===

#[derive(Default, Injectable)]
#[injectable(entry = "inject", target)]
struct Player {
    #[inject]
    clock: Option<Arc<dyn Clock>>,
    #[inject]
    inventory: Option<Arc<dyn Inventory>>,
    logger: Option<Arc<dyn Logger>>,
}

impl Player {
    fn inject(&mut self, logger: Arc<dyn Logger>) {
        self.logger = Some(logger);
    }
}

fn main() -> khidma::Result<()> {
    khidma::logging::init_tracing("khidma=info,basic=info");

    let container = Container::builder()
        .discover()
        .add_provider(&BuiltinServices)
        .build()?;

    println!("{}", container.report());

    const SCENE: i64 = 1;

    let mut player = Player::default();
    container.inject_into(&mut player, SCENE, CallerMetadata::object::<Player>("Player"))?;

    if let (Some(logger), Some(clock)) = (&player.logger, &player.clock) {
        logger.log(&format!("spawned at tick {}", clock.now()));
    }
    if let Some(inventory) = &player.inventory {
        inventory.add("sword");
    }

    let inventory: Arc<dyn Inventory> = container.resolve(SCENE)?;
    println!("scene {SCENE} inventory: {:?}", inventory.items());

    // Unloading the scene drops its scoped services.
    container.reset_scope(SCENE);
    let fresh: Arc<dyn Inventory> = container.resolve(SCENE)?;
    println!("after reload: {:?}", fresh.items());

    let references: Arc<dyn ReferenceRegistry> = container.resolve(ScopeId::GLOBAL)?;
    references.register(Arc::new(player))?;
    references.use_reference(
        |player: Arc<Player>| println!("player registered: {}", player.logger.is_some()),
        || println!("no player"),
    );

    Ok(())
}
