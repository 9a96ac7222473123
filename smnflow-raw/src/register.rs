//! Generic register abstractions for type-safe SMN programming

/// Trait for register layouts that can be converted to/from raw SMN values
///
/// SMN registers are 32 bits wide. This trait converts between a
/// structured layout and the raw dword moved through the data port.
///
/// # Example
///
/// ```ignore
/// use smnflow_raw::register::RegisterLayout;
///
/// #[derive(Debug, Default)]
/// struct MyControl {
///     enable: bool,
///     limit: u8,
/// }
///
/// impl RegisterLayout for MyControl {
///     fn to_raw(&self) -> u32 {
///         (if self.enable { 1 } else { 0 }) | ((self.limit as u32) << 8)
///     }
///
///     fn from_raw(value: u32) -> Self {
///         Self {
///             enable: (value & 1) != 0,
///             limit: ((value >> 8) & 0xFF) as u8,
///         }
///     }
/// }
/// ```
pub trait RegisterLayout: Sized {
    /// Convert this register layout to a raw SMN value
    fn to_raw(&self) -> u32;

    /// Parse a raw SMN value into this register layout
    fn from_raw(value: u32) -> Self;

    /// Validate that the field values fit their bit ranges
    ///
    /// Returns `Ok(())` if valid, or an error message if invalid.
    fn validate(&self) -> Result<(), &'static str> {
        Ok(())
    }
}

/// An SMN register inside a named window, with a typed layout
///
/// The window is resolved to its base address at access time, so the same
/// definition works on every part whose configuration names the window.
///
/// # Example
///
/// ```ignore
/// use smnflow_raw::current_arch::thm;
///
/// let reg = thm::cur_tmp_register();
/// let value = resolver.read(reg.window, reg.offset, None)?;
/// let decoded = thm::ThmTconCurTmp::from_raw(value);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Register<T: RegisterLayout> {
    /// Name of the SMN window holding the register
    pub window: &'static str,
    /// Offset from the window base
    pub offset: u32,
    /// Typed register layout
    pub layout: T,
}

impl<T: RegisterLayout> Register<T> {
    pub fn new(window: &'static str, offset: u32, layout: T) -> Self {
        Self {
            window,
            offset,
            layout,
        }
    }

    /// Create a register with default layout
    pub fn at(window: &'static str, offset: u32) -> Self
    where
        T: Default,
    {
        Self::new(window, offset, T::default())
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        self.layout.validate()
    }

    /// Raw value for this register
    pub fn to_raw(&self) -> u32 {
        self.layout.to_raw()
    }

    /// Update the layout from a raw value
    pub fn load(&mut self, value: u32) {
        self.layout = T::from_raw(value);
    }
}
