//! SPI bus abstractions
//!
//! Chip select is not part of the bus: display drivers frame their own
//! transactions with a separate [`crate::OutputPin`].

/// SPI bus master
///
/// Every call blocks until the bytes have left the shift register, so a
/// caller may release chip select as soon as it returns.
pub trait SpiBus {
    /// Error type for SPI operations
    type Error;

    /// Write data without reading
    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Read data (clocks out zeros)
    fn read(&mut self, buf: &mut [u8]) -> Result<(), Self::Error>;
}
