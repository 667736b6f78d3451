use mio::Poll;
use server_proxy::config::{RouteConfig, ServerConfig};
use server_proxy::http::Method;
use server_proxy::server_manager::ServerManager;
use std::fs;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::thread;
use std::time::Duration;

fn spawn_server(cfg: ServerConfig) {
    thread::spawn(move || {
        let poll = Poll::new().unwrap();
        let mut manager = ServerManager::new(vec![cfg], &poll).unwrap();
        manager.run(poll).unwrap();
    });
    thread::sleep(Duration::from_millis(300));
}

#[test]
fn test_server_chunked_upload() {
    let test_root = "./tmp_test_chunked";
    let upload_path = "./tmp_test_chunked/uploads";
    let _ = fs::remove_dir_all(test_root);
    fs::create_dir_all(upload_path).expect("failed to create test directories");

    let route = RouteConfig {
        path: "/upload".to_string(),
        root: test_root.to_string(),
        upload_dir: "uploads".to_string(),
        methods: vec![Method::POST, Method::GET],
        ..Default::default()
    };

    let server_cfg = ServerConfig {
        server_name: "127.0.0.1".to_string(),
        ports: vec![8180],
        routes: vec![route],
        default_server: true,
        client_max_body_size: 1024 * 1024,
        ..Default::default()
    };

    spawn_server(server_cfg);

    let mut stream = TcpStream::connect("127.0.0.1:8180").expect("failed to connect to server");
    stream.set_read_timeout(Some(Duration::from_secs(2))).unwrap();

    let headers = "POST /upload/test.txt HTTP/1.1\r\n\
                   Host: 127.0.0.1:8180\r\n\
                   Transfer-Encoding: chunked\r\n\
                   Content-Type: text/plain\r\n\r\n";
    stream.write_all(headers.as_bytes()).unwrap();
    stream.write_all(b"5\r\nHello\r\n").unwrap();
    thread::sleep(Duration::from_millis(100));
    stream.write_all(b"7\r\n World!\r\n").unwrap();
    thread::sleep(Duration::from_millis(100));
    stream.write_all(b"0\r\n\r\n").unwrap();
    stream.flush().unwrap();

    let mut buffer = [0u8; 4096];
    let n = stream.read(&mut buffer).expect("no response from server");
    let response = String::from_utf8_lossy(&buffer[..n]);
    assert!(response.contains("201 Created") || response.contains("200 OK"));

    let mut found_content = false;
    for entry in fs::read_dir(upload_path).unwrap() {
        let path = entry.unwrap().path();
        if path.is_file() && fs::read_to_string(&path).unwrap() == "Hello World!" {
            found_content = true;
        }
    }
    assert!(found_content, "chunked data was not correctly assembled on disk");

    let _ = fs::remove_dir_all(test_root);
}

#[test]
fn test_pipelined_requests() {
    let test_root = "./tmp_test_pipeline";
    let _ = fs::remove_dir_all(test_root);
    fs::create_dir_all(test_root).unwrap();
    fs::write(format!("{test_root}/index.html"), "Hello").unwrap();

    let route = RouteConfig {
        path: "/".to_string(),
        root: test_root.to_string(),
        methods: vec![Method::GET],
        ..Default::default()
    };

    let server_cfg = ServerConfig {
        server_name: "localhost".to_string(),
        ports: vec![8181],
        routes: vec![route],
        default_server: true,
        ..Default::default()
    };

    spawn_server(server_cfg);

    let mut stream = TcpStream::connect("127.0.0.1:8181").unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(2))).unwrap();

    let pipeline_data = "GET /index.html HTTP/1.1\r\nHost: localhost\r\n\r\n\
                         GET /index.html HTTP/1.1\r\nHost: localhost\r\n\r\n";
    stream.write_all(pipeline_data.as_bytes()).unwrap();

    let mut buffer = [0u8; 4096];
    let n1 = stream.read(&mut buffer).unwrap();
    let res1 = String::from_utf8_lossy(&buffer[..n1]);
    assert!(res1.contains("200 OK"), "first response was not 200 OK");

    if res1.matches("HTTP/1.1").count() < 2 {
        let n2 = stream.read(&mut buffer).unwrap();
        let res2 = String::from_utf8_lossy(&buffer[..n2]);
        assert!(res2.contains("200 OK"), "second response was not 200 OK");
    }

    let _ = fs::remove_dir_all(test_root);
}

#[test]
fn test_delete_removes_file() {
    let test_root = "./tmp_test_delete";
    let _ = fs::remove_dir_all(test_root);
    fs::create_dir_all(test_root).unwrap();
    fs::write(format!("{test_root}/doomed.txt"), "bye").unwrap();

    let route = RouteConfig {
        path: "/".to_string(),
        root: test_root.to_string(),
        methods: vec![Method::GET, Method::DELETE],
        ..Default::default()
    };

    let server_cfg = ServerConfig {
        server_name: "localhost".to_string(),
        ports: vec![8182],
        routes: vec![route],
        default_server: true,
        ..Default::default()
    };

    spawn_server(server_cfg);

    let mut stream = TcpStream::connect("127.0.0.1:8182").unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    stream
        .write_all(b"DELETE /doomed.txt HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .unwrap();

    let mut buffer = [0u8; 4096];
    let n = stream.read(&mut buffer).unwrap();
    let response = String::from_utf8_lossy(&buffer[..n]);
    assert!(response.contains("200 OK") || response.contains("204 No Content"));
    assert!(!std::path::Path::new(&format!("{test_root}/doomed.txt")).exists());

    let _ = fs::remove_dir_all(test_root);
}
