pub mod mock_directory;
