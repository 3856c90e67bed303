#![deny(unsafe_code)]
#![deny(warnings)]
#![no_main]
#![no_std]

use defmt_rtt as _; // global logger
use panic_probe as _;
use rtic::app;
use rtic_monotonics::stm32::prelude::*;

use clock_core::SnapshotCell;

mod config;
mod door;
mod eth;
mod network;
mod rtc;
mod timebase;

stm32_tim2_monotonic!(Mono, 1_000_000);

/// Local time handed from the clock loop to the display interrupt
static SNAPSHOT: SnapshotCell = SnapshotCell::new();

#[app(device = embassy_stm32, peripherals = true, dispatchers = [USART1])]
mod app {
    use super::*;
    use defmt::info;
    use embassy_futures::select::{select3, Either3};
    use embassy_stm32::exti::ExtiInput;
    use embassy_stm32::gpio::{Level, Output, Pull, Speed};
    use embassy_stm32::peripherals;
    use embassy_stm32::rcc::{Hse, HseMode, LsConfig, LseConfig, LseMode};
    use embassy_stm32::rtc::{Rtc, RtcConfig};
    use embassy_stm32::spi::{self, Spi};
    use embassy_stm32::time::Hertz;
    use embassy_stm32::timer::low_level::Timer;

    use clock_core::{DisplayMultiplexer, DstAwareClock, MainLoop, Scheduler};

    use crate::door::DoorActuator;
    use crate::network::{EthernetLink, SntpClient};
    use crate::rtc::HardwareRtc;
    use crate::timebase::MonoTimebase;

    type SpiPeripheral = embassy_stm32::Peri<'static, peripherals::SPI2>;
    type PinPB13 = embassy_stm32::Peri<'static, peripherals::PB13>;
    type PinPB15 = embassy_stm32::Peri<'static, peripherals::PB15>;
    type PinPB14 = embassy_stm32::Peri<'static, peripherals::PB14>;
    type PinPC6 = embassy_stm32::Peri<'static, peripherals::PC6>;
    type PinPC3 = embassy_stm32::Peri<'static, peripherals::PC3>;
    type PinPC2 = embassy_stm32::Peri<'static, peripherals::PC2>;
    type ExtiChannel = embassy_stm32::Peri<'static, peripherals::EXTI2>;
    type DmaTx = embassy_stm32::Peri<'static, peripherals::DMA1_CH4>;
    type DmaRx = embassy_stm32::Peri<'static, peripherals::DMA1_CH3>;

    type Display = DisplayMultiplexer<Output<'static>, Output<'static>, 6>;

    struct NetworkPeripherals {
        spi: SpiPeripheral,
        sck: PinPB13,
        mosi: PinPB15,
        miso: PinPB14,
        cs: PinPC6,
        reset: PinPC3,
        int: PinPC2,
        exti: ExtiChannel,
        dma_tx: DmaTx,
        dma_rx: DmaRx,
    }

    /// Hardware owned by the clock loop
    struct ClockPeripherals {
        rtc: Rtc,
        status_led: Output<'static>,
        door: DoorActuator<Output<'static>>,
    }

    #[shared]
    struct Shared {}

    #[local]
    struct Local {
        display: Display,
        display_timer: Timer<'static, peripherals::TIM3>,
    }

    #[init]
    fn init(_cx: init::Context) -> (Shared, Local) {
        info!("NTP wall clock starting...");

        // Adafruit Feather STM32F405: 12 MHz HSE, 32.768 kHz LSE (PC14/PC15)
        let mut config = embassy_stm32::Config::default();
        config.rcc.hse = Some(Hse {
            freq: Hertz(12_000_000),
            mode: HseMode::Oscillator,
        });

        // HSE (12 MHz) / PREDIV(6) = 2 MHz (PLL input)
        // 2 MHz * MUL(168) = 336 MHz (VCO)
        // VCO / DIVP(4) = 84 MHz (SYSCLK)
        config.rcc.pll_src = embassy_stm32::rcc::PllSource::HSE;
        config.rcc.pll = Some(embassy_stm32::rcc::Pll {
            prediv: embassy_stm32::rcc::PllPreDiv::DIV6, // 12 MHz / 6 = 2 MHz
            mul: embassy_stm32::rcc::PllMul::MUL168,     // 2 MHz * 168 = 336 MHz (VCO)
            divp: Some(embassy_stm32::rcc::PllPDiv::DIV4), // 336 MHz / 4 = 84 MHz (SYSCLK)
            divq: None,
            divr: None,
        });
        config.rcc.sys = embassy_stm32::rcc::Sysclk::PLL1_P;
        config.rcc.ahb_pre = embassy_stm32::rcc::AHBPrescaler::DIV1; // 84 MHz
        config.rcc.apb1_pre = embassy_stm32::rcc::APBPrescaler::DIV2; // 42 MHz
        config.rcc.apb2_pre = embassy_stm32::rcc::APBPrescaler::DIV1; // 84 MHz

        config.rcc.ls = LsConfig {
            rtc: embassy_stm32::rcc::RtcClockSource::LSE,
            lsi: false,
            lse: Some(LseConfig {
                frequency: Hertz(32_768),
                mode: LseMode::Oscillator(embassy_stm32::rcc::LseDrive::MediumHigh),
            }),
        };

        let p = embassy_stm32::init(config);
        info!("System initialized: SYSCLK=84MHz, LSE=32.768kHz");

        // TIM2 on APB1: timer clock = 2*APB1 when prescaler != 1
        let timer_clock_hz = 84_000_000;
        Mono::start(timer_clock_hz);
        info!("TIM2 monotonic timer initialized at 1 MHz");

        let rtc = Rtc::new(p.RTC, RtcConfig::default());
        info!("Internal RTC initialized with LSE");

        let status_led = Output::new(p.PC1, Level::Low, Speed::Low);

        // Segments a..g, dp
        let segments = [
            Output::new(p.PA4, Level::Low, Speed::Medium),
            Output::new(p.PA5, Level::Low, Speed::Medium),
            Output::new(p.PA6, Level::Low, Speed::Medium),
            Output::new(p.PA7, Level::Low, Speed::Medium),
            Output::new(p.PC4, Level::Low, Speed::Medium),
            Output::new(p.PC5, Level::Low, Speed::Medium),
            Output::new(p.PB0, Level::Low, Speed::Medium),
            Output::new(p.PB1, Level::Low, Speed::Medium),
        ];
        // Digit commons, left to right
        let commons = [
            Output::new(p.PB8, Level::Low, Speed::Medium),
            Output::new(p.PB9, Level::Low, Speed::Medium),
            Output::new(p.PC7, Level::Low, Speed::Medium),
            Output::new(p.PB10, Level::Low, Speed::Medium),
            Output::new(p.PB11, Level::Low, Speed::Medium),
            Output::new(p.PB12, Level::Low, Speed::Medium),
        ];
        let display = DisplayMultiplexer::new(commons, segments, config::DISPLAY);

        let display_timer = Timer::new(p.TIM3);
        display_timer.set_frequency(Hertz(config::DISPLAY_REFRESH_HZ));
        display_timer.enable_update_interrupt(true);
        display_timer.start();
        info!("Display refresh at {} Hz", config::DISPLAY_REFRESH_HZ);

        let door = DoorActuator::new(
            Output::new(p.PA15, Level::Low, Speed::Low),
            Output::new(p.PB4, Level::Low, Speed::Low),
        );

        let net_periph = NetworkPeripherals {
            spi: p.SPI2,
            sck: p.PB13,
            mosi: p.PB15,
            miso: p.PB14,
            cs: p.PC6,
            reset: p.PC3,
            int: p.PC2,
            exti: p.EXTI2,
            dma_tx: p.DMA1_CH4,
            dma_rx: p.DMA1_CH3,
        };
        let clock_periph = ClockPeripherals {
            rtc,
            status_led,
            door,
        };

        network_task::spawn(net_periph, clock_periph).ok();

        (
            Shared {},
            Local {
                display,
                display_timer,
            },
        )
    }

    /// Display refresh: one digit position per TIM3 update
    #[task(binds = TIM3, priority = 3, local = [display, display_timer])]
    fn display_refresh(cx: display_refresh::Context) {
        if cx.local.display_timer.clear_update_interrupt() {
            cx.local.display.on_timer_fire(&SNAPSHOT);
        }
    }

    /// Network task - runs the network stack and the clock loop
    ///
    /// Stack is !Send and must remain within this task.
    #[task(priority = 1)]
    async fn network_task(
        _cx: network_task::Context,
        periph: NetworkPeripherals,
        clock_periph: ClockPeripherals,
    ) -> ! {
        use embassy_net::{Config, StackResources};
        use static_cell::StaticCell;

        info!("Network task started");

        let mut spi_config = spi::Config::default();
        spi_config.frequency = Hertz(10_000_000); // 10 MHz for W5500

        let spi = Spi::new(
            periph.spi,
            periph.sck,
            periph.mosi,
            periph.miso,
            periph.dma_tx,
            periph.dma_rx,
            spi_config,
        );

        let eth_periph = eth::EthPeripherals {
            spi,
            cs: Output::new(periph.cs, Level::High, Speed::VeryHigh),
            reset: Output::new(periph.reset, Level::High, Speed::Low),
            int: ExtiInput::new(periph.int, periph.exti, Pull::Up),
        };

        let (device, w5500_runner) =
            defmt::unwrap!(eth::init_w5500(eth_periph, config::NETWORK.mac_addr).await);

        static RESOURCES: StaticCell<StackResources<3>> = StaticCell::new();
        let (stack, mut net_runner) = embassy_net::new(
            device,
            Config::dhcpv4(Default::default()),
            RESOURCES.init(StackResources::new()),
            config::NETWORK.seed,
        );
        info!("Network stack initialized with DHCP");

        let clock = DstAwareClock::new(
            config::CLOCK,
            &SNAPSHOT,
            EthernetLink::new(stack, config::LINK),
            SntpClient::new(stack, config::SNTP),
            HardwareRtc::new(clock_periph.rtc),
            MonoTimebase,
        );
        let clock = defmt::unwrap!(clock);
        let scheduler = defmt::unwrap!(Scheduler::<{ config::MAX_RULES }>::new(&config::RULES));
        let main_loop = MainLoop::new(
            clock,
            scheduler,
            clock_periph.door,
            clock_periph.status_led,
            config::LOOP,
        );

        match select3(w5500_runner.run(), net_runner.run(), main_loop.run()).await {
            Either3::First(never) | Either3::Second(never) | Either3::Third(never) => never,
        }
    }

    /// RTIC idle task - WFI sleep mode when no tasks active
    #[idle]
    fn idle(_cx: idle::Context) -> ! {
        info!("Idle task started - entering WFI loop");
        loop {
            cortex_m::asm::wfi();
        }
    }
}
