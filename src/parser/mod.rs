pub mod trs80gp;
