use msp430fr2355 as pac;

/// Register access for one digital I/O port.
pub trait Port: 'static {
    /// Register block of the port.
    ///
    /// # Safety
    /// The caller must own the port or only touch bits it owns.
    unsafe fn regs() -> &'static Self;

    fn pxin_rd(&self) -> u8;

    fn pxout_set(&self, bits: u8);
    fn pxout_clear(&self, bits: u8);

    fn pxdir_set(&self, bits: u8);
    fn pxdir_clear(&self, bits: u8);

    fn pxren_set(&self, bits: u8);
    fn pxren_clear(&self, bits: u8);

    fn pxsel0_clear(&self, bits: u8);
    fn pxsel1_clear(&self, bits: u8);
}

/// A port that can raise pin-change interrupts.
pub trait IntrPort: Port {
    fn pxies_set(&self, bits: u8);

    fn pxie_set(&self, bits: u8);
    fn pxie_clear(&self, bits: u8);

    fn pxifg_rd(&self) -> u8;
    fn pxifg_clear(&self, bits: u8);
}

macro_rules! reg_methods {
    ($reg:ident, $set:ident, $clear:ident) => {
        #[inline(always)]
        fn $set(&self, bits: u8) {
            unsafe { self.$reg.set_bits(|w| w.bits(bits)) }
        }

        #[inline(always)]
        fn $clear(&self, bits: u8) {
            unsafe { self.$reg.clear_bits(|w| w.bits(bits)) }
        }
    };
}

macro_rules! port_impl {
    ($px:ident: $Px:ident =>
     $pxin:ident, $pxout:ident, $pxdir:ident, $pxren:ident, $pxsel0:ident, $pxsel1:ident
     $(, [$pxies:ident, $pxie:ident, $pxifg:ident])?
    ) => {
        impl Port for pac::$px::RegisterBlock {
            #[inline(always)]
            unsafe fn regs() -> &'static Self {
                &*pac::$Px::ptr()
            }

            #[inline(always)]
            fn pxin_rd(&self) -> u8 {
                self.$pxin.read().bits()
            }

            reg_methods!($pxout, pxout_set, pxout_clear);
            reg_methods!($pxdir, pxdir_set, pxdir_clear);
            reg_methods!($pxren, pxren_set, pxren_clear);

            #[inline(always)]
            fn pxsel0_clear(&self, bits: u8) {
                unsafe { self.$pxsel0.clear_bits(|w| w.bits(bits)) }
            }

            #[inline(always)]
            fn pxsel1_clear(&self, bits: u8) {
                unsafe { self.$pxsel1.clear_bits(|w| w.bits(bits)) }
            }
        }

        $(
            impl IntrPort for pac::$px::RegisterBlock {
                #[inline(always)]
                fn pxies_set(&self, bits: u8) {
                    unsafe { self.$pxies.set_bits(|w| w.bits(bits)) }
                }

                reg_methods!($pxie, pxie_set, pxie_clear);

                #[inline(always)]
                fn pxifg_rd(&self) -> u8 {
                    self.$pxifg.read().bits()
                }

                #[inline(always)]
                fn pxifg_clear(&self, bits: u8) {
                    unsafe { self.$pxifg.clear_bits(|w| w.bits(bits)) }
                }
            }
        )?
    };
}

port_impl!(p1: P1 => p1in, p1out, p1dir, p1ren, p1sel0, p1sel1, [p1ies, p1ie, p1ifg]);
port_impl!(p2: P2 => p2in, p2out, p2dir, p2ren, p2sel0, p2sel1, [p2ies, p2ie, p2ifg]);
port_impl!(p3: P3 => p3in, p3out, p3dir, p3ren, p3sel0, p3sel1, [p3ies, p3ie, p3ifg]);
port_impl!(p4: P4 => p4in, p4out, p4dir, p4ren, p4sel0, p4sel1, [p4ies, p4ie, p4ifg]);
port_impl!(p5: P5 => p5in, p5out, p5dir, p5ren, p5sel0, p5sel1);
port_impl!(p6: P6 => p6in, p6out, p6dir, p6ren, p6sel0, p6sel1);
