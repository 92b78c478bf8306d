pub mod mock_forum_server;
