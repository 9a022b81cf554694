pub mod booklet;
