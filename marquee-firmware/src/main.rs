//! Marquee - Scrolling LED Matrix Message Display
//!
//! Firmware for an RP2040 driving a 128x32 HUB75 panel, with an ESP32-class
//! co-processor on UART0 doing Wi-Fi and HTTP.
//!
//! Core 0 runs the blocking message loop from `marquee-core`. Core 1 runs an
//! embassy executor with the panel refresh and the watchdog feeder.

#![no_std]
#![no_main]

extern crate alloc;

mod assets;
mod clock;
mod hub75;
mod link;
mod matrix;
mod watchdog;

use alloc::rc::Rc;
use core::cell::RefCell;

use defmt::*;
use embassy_executor::Executor;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::multicore::{spawn_core1, Stack};
use embassy_rp::peripherals::UART0;
use embassy_rp::uart::{BufferedInterruptHandler, Config as UartConfig, Uart};
use embassy_rp::watchdog::Watchdog as HardwareWatchdog;
use embedded_alloc::LlffHeap as Heap;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use marquee_core::config::MarqueeConfig;
use marquee_core::Runtime;

use crate::assets::{AssetStore, LinkDecoder};
use crate::clock::EmbassyClock;
use crate::hub75::Hub75Pins;
use crate::link::{CoprocessorLink, LinkTransport};
use crate::matrix::{MatrixDisplay, PANEL_HEIGHT, PANEL_WIDTH};
use crate::watchdog::{LivenessWatchdog, LIVENESS_WINDOW_MS};

// Heap for feed bodies, parsed messages and decoded images
#[global_allocator]
static HEAP: Heap = Heap::empty();

// Heap size: 160KB
const HEAP_SIZE: usize = 160 * 1024;

/// Link speed to the co-processor
const LINK_BAUD: u32 = 460_800;

/// Configuration validated by build.rs from marquee.toml
static CONFIG_BLOB: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/marquee.bin"));

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

// Static cells for UART buffers (must live forever)
static TX_BUF: StaticCell<[u8; 512]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 1024]> = StaticCell::new();

static CORE1_STACK: StaticCell<Stack<8192>> = StaticCell::new();
static EXECUTOR1: StaticCell<Executor> = StaticCell::new();

#[cortex_m_rt::entry]
fn main() -> ! {
    info!("Marquee firmware starting...");

    init_heap();

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let config = load_config();

    // Core 1: panel refresh and watchdog feeding
    // Pin assignments are board-specific
    let pins = Hub75Pins {
        r1: Output::new(p.PIN_2, Level::Low),
        g1: Output::new(p.PIN_3, Level::Low),
        b1: Output::new(p.PIN_4, Level::Low),
        r2: Output::new(p.PIN_5, Level::Low),
        g2: Output::new(p.PIN_8, Level::Low),
        b2: Output::new(p.PIN_9, Level::Low),
        addr: [
            Output::new(p.PIN_10, Level::Low),
            Output::new(p.PIN_16, Level::Low),
            Output::new(p.PIN_18, Level::Low),
            Output::new(p.PIN_20, Level::Low),
        ],
        clk: Output::new(p.PIN_11, Level::Low),
        lat: Output::new(p.PIN_12, Level::Low),
        oe: Output::new(p.PIN_13, Level::High),
    };
    let hw_watchdog = HardwareWatchdog::new(p.WATCHDOG);
    let bit_depth = config.display.bit_depth;

    spawn_core1(p.CORE1, CORE1_STACK.init(Stack::new()), move || {
        let executor1 = EXECUTOR1.init(Executor::new());
        executor1.run(|spawner| {
            spawner.spawn(hub75::refresh_task(pins, bit_depth)).unwrap();
            spawner
                .spawn(watchdog::watchdog_task(hw_watchdog, LIVENESS_WINDOW_MS))
                .unwrap();
        })
    });
    info!("Core 1 started");

    // Setup UART for the co-processor link
    let mut uart_config = UartConfig::default();
    uart_config.baudrate = LINK_BAUD;

    let tx_buf = TX_BUF.init([0u8; 512]);
    let rx_buf = RX_BUF.init([0u8; 1024]);

    let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, uart_config);
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);

    info!("UART initialized for co-processor link");

    let link = Rc::new(RefCell::new(CoprocessorLink::new(
        uart,
        &config.credentials.api_key,
    )));
    let store = Rc::new(RefCell::new(AssetStore::new()));

    let decoder = LinkDecoder::new(link.clone(), store.clone(), config.display.width);
    let display = MatrixDisplay::new(store, config.animation.icon_gap_px);
    let transport = LinkTransport::new(link.clone());

    let mut runtime = Runtime::new(
        config,
        transport,
        decoder,
        display,
        LivenessWatchdog,
        EmbassyClock,
    );

    runtime.show_status("Connecting");
    if let Err(e) = link.borrow_mut().open_session() {
        warn!("Could not open session: {:?}", e);
    }

    runtime.run()
}

/// Initialize the heap allocator
fn init_heap() {
    use core::mem::MaybeUninit;
    static mut HEAP_MEM: [MaybeUninit<u8>; HEAP_SIZE] = [MaybeUninit::uninit(); HEAP_SIZE];
    #[allow(static_mut_refs)]
    unsafe {
        HEAP.init(HEAP_MEM.as_ptr() as usize, HEAP_SIZE)
    }
}

/// Decode the embedded configuration, falling back to defaults
fn load_config() -> MarqueeConfig {
    let mut config = match MarqueeConfig::from_blob(CONFIG_BLOB) {
        Ok(config) => {
            info!("Loaded configuration ({} bytes)", CONFIG_BLOB.len());
            config
        }
        Err(e) => {
            error!("Embedded configuration rejected: {}", e);
            warn!("Using default configuration");
            MarqueeConfig::default()
        }
    };

    let display = &mut config.display;
    if display.width as usize != PANEL_WIDTH || display.height as usize != PANEL_HEIGHT {
        warn!(
            "Configured panel {}x{} does not match this board, using {}x{}",
            display.width, display.height, PANEL_WIDTH, PANEL_HEIGHT
        );
        display.width = PANEL_WIDTH as u16;
        display.height = PANEL_HEIGHT as u16;
    }
    config
}
