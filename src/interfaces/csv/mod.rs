pub mod shipping_writer;
