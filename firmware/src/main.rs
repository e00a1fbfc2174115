#![no_main]
#![no_std]
#![feature(abi_msp430_interrupt)]

use core::cell::RefCell;

use critical_section::Mutex;
use loadgate::board::{Board, PulseIn, PulseInterrupt, Scl, Sda, SdaInterrupt, SleepFlag};
use loadgate::bus::BusSlave;
use loadgate::command::CommandLayer;
use loadgate::config::{Config, DEFAULT_ADDRESS, DEFAULT_SLEEP_SECONDS};
use loadgate::dispatch::Dispatcher;
use loadgate::hal::Cpu;
use loadgate::pulse::PulseCounter;
use loadgate::shared::SharedState;
use loadgate::sleep::SleepScheduler;
use loadgate::supervisor::Supervisor;
use msp430_rt::entry;
use msp430fr2355::interrupt;
use panic_msp430 as _;

const CONFIG: Config = match Config::new()
    .address(DEFAULT_ADDRESS)
    .default_sleep_seconds(DEFAULT_SLEEP_SECONDS)
    .validate()
{
    Ok(config) => config,
    Err(_) => panic!("invalid configuration"),
};

type Bus = BusSlave<Sda, Scl, SdaInterrupt, CommandLayer<'static>>;
type Counter = PulseCounter<'static, PulseIn, PulseInterrupt, SleepFlag>;

static SHARED: SharedState = SharedState::new(CONFIG.default_sleep_seconds);
static PIN_CHANGE: Mutex<RefCell<Option<Dispatcher<'static, Bus, Counter>>>> =
    Mutex::new(RefCell::new(None));

#[entry]
fn main() -> ! {
    let periph = msp430fr2355::Peripherals::take().unwrap();
    let Board {
        sda,
        scl,
        pulse,
        load,
        sda_irq,
        pulse_irq,
        wdt,
        mut cpu,
        sleep,
        parking,
    } = Board::new(periph);

    let commands = CommandLayer::new(CONFIG, &SHARED);
    let bus = BusSlave::new(sda, scl, sda_irq, commands);
    let counter = PulseCounter::new(pulse, pulse_irq, sleep, &SHARED.pulses, &SHARED.wake);
    let mut dispatcher = Dispatcher::new(bus, counter, &SHARED.wake);
    dispatcher.arm();

    critical_section::with(|cs| {
        PIN_CHANGE.borrow_ref_mut(cs).replace(dispatcher);
    });
    // Mainline only masks interrupts around its sleep checks, the bus engine depends on it
    cpu.enable_interrupts();

    let scheduler = SleepScheduler::new(wdt, cpu, &SHARED.wake);
    Supervisor::new(load, scheduler, parking, &SHARED).run()
}

#[interrupt(wake_cpu)]
fn PORT1() {
    // Each handler clears its own flag; one left set brings us straight back here
    critical_section::with(|cs| {
        if let Some(dispatcher) = PIN_CHANGE.borrow_ref_mut(cs).as_mut() {
            dispatcher.on_interrupt();
        }
    });
}

// Only here to wake the CPU for the next sleep tick
#[interrupt(wake_cpu)]
fn WDT() {}

// The compiler will emit calls to the abort() compiler intrinsic if debug assertions are
// enabled (default for dev profile). MSP430 does not actually have meaningful abort() support
// so we provide our own.
#[no_mangle]
extern "C" fn abort() -> ! {
    panic!();
}
