pub mod u508_record_reception;
