pub mod fw_driver;
pub mod pins;
