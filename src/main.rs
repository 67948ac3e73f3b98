#![no_std]
#![no_main]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::wildcard_imports)]

use defmt_rtt as _;
use panic_probe as _;
use rtic_reflow::TimeBase;

/// Shared between the TIM3 interrupt, which advances it and switches the heater, and the main
/// loop, which sets the duty cycle and consumes ticks.
static TIME_BASE: TimeBase = TimeBase::new();

#[rtic::app(device = stm32f0xx_hal::pac, dispatchers = [USART1])]
mod app {
    use cortex_m::peripheral::{NVIC, SCB};
    use defmt::*;
    use embedded_hal::spi::MODE_0;
    use rtic_monotonics::{
        stm32::{Tim2 as Mono, *},
        Monotonic,
    };
    use rtic_reflow::{
        config::TIME_BASE_PERIOD,
        oven::{Action, Oven},
        outputs::{PinHeater, PinOutputs},
        panel::Panel,
        storage::RomStore,
        terminal::LineBuffer,
        thermocouple::Max31855,
        ProportionalTrim,
    };
    use stm32f0xx_hal::{
        delay::Delay,
        gpio::{
            gpioa::{PA4, PA5, PA6, PA7},
            Alternate, Input, Output, Pin, PullUp, PushPull, AF0,
        },
        pac::{Interrupt, IWDG, SPI1, TIM3, USART2},
        prelude::*,
        serial::{self, Event, Rx, Serial, Tx},
        spi::{EightBit, Spi},
        timers::{self, Timer},
        watchdog::Watchdog,
    };

    use super::TIME_BASE;

    type Thermocouple = Max31855<
        Spi<SPI1, PA5<Alternate<AF0>>, PA6<Alternate<AF0>>, PA7<Alternate<AF0>>, EightBit>,
        PA4<Output<PushPull>>,
    >;
    type Outputs = PinOutputs<Pin<Output<PushPull>>, Pin<Output<PushPull>>, Delay>;
    type Buttons = Panel<Pin<Input<PullUp>>, Pin<Input<PullUp>>, Pin<Input<PullUp>>>;

    #[shared]
    struct Shared {
        buffer: LineBuffer,
    }

    #[local]
    struct Local {
        // Time base
        timer: Timer<TIM3>,
        heater: PinHeater<Pin<Output<PushPull>>>,

        // Host link
        rx: Rx<USART2>,
        tx: Tx<USART2>,

        // Main loop
        oven: Oven<'static, ProportionalTrim>,
        thermocouple: Thermocouple,
        outputs: Outputs,
        panel: Buttons,
        store: RomStore,
    }

    #[init]
    fn init(mut cx: init::Context) -> (Shared, Local) {
        // Set system clock to 24 MHz
        let mut rcc = cx
            .device
            .RCC
            .configure()
            .hsi48()
            .sysclk(24.mhz())
            .pclk(24.mhz())
            .hclk(24.mhz())
            .freeze(&mut cx.device.FLASH);

        trace!("sysclk: {}", rcc.clocks.sysclk().0);
        trace!("hclk: {}", rcc.clocks.hclk().0);
        trace!("pclk: {}", rcc.clocks.pclk().0);

        // Enable tim2 monotonic
        let token = rtic_monotonics::create_stm32_tim2_monotonic_token!();
        Mono::start(24_000_000, token);

        // Setup systick delay, used for relay settling
        let delay = Delay::new(cx.core.SYST, &rcc);

        // Setup GPIO
        let gpioa = cx.device.GPIOA.split(&mut rcc);
        let gpiob = cx.device.GPIOB.split(&mut rcc);

        // Heater SSR, contactor and buzzer start off
        let mut heater = PinHeater::new(gpiob.pb4.into_push_pull_output(&cx.cs).downgrade());
        heater.drive(false);
        let outputs = PinOutputs::new(
            gpiob.pb5.into_push_pull_output(&cx.cs).downgrade(),
            gpiob.pb6.into_push_pull_output(&cx.cs).downgrade(),
            delay,
        );

        let panel = Panel::new(
            gpioa.pa0.into_pull_up_input(&cx.cs).downgrade(),
            gpioa.pa1.into_pull_up_input(&cx.cs).downgrade(),
            gpioa.pa8.into_pull_up_input(&cx.cs).downgrade(),
        );

        // Setup MAX31855 on SPI1
        let spi = Spi::spi1(
            cx.device.SPI1,
            (
                gpioa.pa5.into_alternate_af0(&cx.cs),
                gpioa.pa6.into_alternate_af0(&cx.cs),
                gpioa.pa7.into_alternate_af0(&cx.cs),
            ),
            MODE_0,
            1.mhz(),
            &mut rcc,
        );
        let thermocouple = Max31855::new(spi, gpioa.pa4.into_push_pull_output(&cx.cs));

        // Setup USART & USART interrupt
        let mut usart = Serial::usart2(
            cx.device.USART2,
            (
                gpioa.pa2.into_alternate_af1(&cx.cs),
                gpioa.pa15.into_alternate_af1(&cx.cs),
            ),
            115_200.bps(),
            &mut rcc,
        );
        usart.listen(Event::Rxne);
        let (tx, rx) = usart.split();

        let store = RomStore::new();
        let oven = Oven::new(&TIME_BASE, &store, ProportionalTrim);

        // Start the time base
        let hz = 1000 / TIME_BASE_PERIOD.to_millis();
        let mut timer = Timer::tim3(cx.device.TIM3, hz.hz(), &mut rcc);
        timer.listen(timers::Event::TimeOut);

        let _ = watchdog::spawn(cx.device.IWDG);

        info!("reflow oven ready");

        (
            Shared {
                buffer: LineBuffer::new(),
            },
            Local {
                timer,
                heater,
                rx,
                tx,
                oven,
                thermocouple,
                outputs,
                panel,
                store,
            },
        )
    }

    /// The main loop. Everything that may block runs here, never in the timer interrupt.
    #[idle(local = [oven, thermocouple, outputs, panel, store, tx], shared = [buffer])]
    fn idle(mut cx: idle::Context) -> ! {
        let idle::LocalResources {
            oven,
            thermocouple,
            outputs,
            panel,
            store,
            tx,
            ..
        } = cx.local;

        loop {
            let buttons = panel.poll();
            oven.poll(buttons, thermocouple, outputs, tx, store);

            while let Some(line) = cx.shared.buffer.lock(LineBuffer::next_line) {
                if let Some(Action::EnterBootloader) = oven.handle_line(&line, tx, store, outputs)
                {
                    NVIC::mask(Interrupt::TIM3);
                    SCB::sys_reset();
                }
            }

            // Woken by the time base at least every 50 ms
            cortex_m::asm::wfi();
        }
    }

    #[task(priority = 1)]
    async fn watchdog(_: watchdog::Context, wdg: IWDG) {
        let mut wdg = Watchdog::new(wdg);
        wdg.start(1.hz());

        loop {
            wdg.feed();
            Mono::delay(100.millis()).await;
        }
    }

    /// Time base: advance the slot counter and switch the heater. Nothing else.
    #[task(binds = TIM3, priority = 3, local = [timer, heater])]
    fn tim3(cx: tim3::Context) {
        // Clears the update flag
        let _ = cx.local.timer.wait();
        cx.local.heater.drive(TIME_BASE.on_interrupt());
    }

    #[task(binds = USART2, priority = 2, local = [rx, dropped: u32 = 0], shared = [buffer])]
    fn usart2(mut cx: usart2::Context) {
        let rx = cx.local.rx;
        let dropped = cx.local.dropped;

        cx.shared.buffer.lock(|buffer| loop {
            match rx.read() {
                Ok(b) => {
                    if !buffer.push(b) {
                        *dropped += 1;
                    }
                }
                Err(nb::Error::WouldBlock) => break,
                Err(nb::Error::Other(serial::Error::Framing)) => warn!("USART error: Framing"),
                Err(nb::Error::Other(serial::Error::Noise)) => warn!("USART error: Noise"),
                Err(nb::Error::Other(serial::Error::Overrun)) => warn!("USART error: Overrun"),
                Err(nb::Error::Other(serial::Error::Parity)) => warn!("USART error: Parity"),
                Err(nb::Error::Other(_)) => warn!("USART error: Unknown"),
            }
        });

        if *dropped > 0 {
            trace!("USART2 bytes dropped: {}", *dropped);
        }
    }

    timestamp!("{=u64:us}", {
        Mono::now().duration_since_epoch().to_micros()
    });
}
